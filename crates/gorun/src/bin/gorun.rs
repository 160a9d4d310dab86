use std::path::PathBuf;

use clap::Parser;

use gorun::common::cli::{ColorPolicy, CommonOpts, RootOptions};
use gorun::common::config::{GorunConfig, current_host_name, default_config_path};
use gorun::common::env::{VASP_PATH, require_env};
use gorun::common::setup::setup_logging;
use gorun::common::utils::fs::{absolute_path, get_current_dir};
use gorun::output::{Output, create_output};
use gorun::queue::slurm::SlurmHandler;
use gorun::submit::backup::RsyncArchiver;
use gorun::submit::prepare::{SlurmLogCleaner, VaspInputPreparer};
use gorun::submit::request::UserResources;
use gorun::submit::{Controller, SubmitOptions};

fn make_printer(opts: &CommonOpts) -> Box<dyn Output> {
    match opts.colors {
        ColorPolicy::Always => colored::control::set_override(true),
        ColorPolicy::Never => colored::control::set_override(false),
        ColorPolicy::Auto => {}
    }
    create_output(opts.output_mode)
}

async fn command_submit(opts: RootOptions, printer: &dyn Output) -> gorun::Result<i32> {
    let vasp_path = PathBuf::from(require_env(VASP_PATH)?);
    let config_path = match opts.common.config {
        Some(path) => absolute_path(path)?,
        None => default_config_path()?,
    };
    let config = GorunConfig::load(&config_path)?;
    let host = current_host_name();
    let (server_name, server) = config.resolve_server(&host)?;
    log::debug!("Host {host} resolved to server {server_name}");

    let workdir = get_current_dir()?;
    let manager = SlurmHandler::new(workdir.clone())?;
    let archiver = RsyncArchiver::new()?;
    let preparer = VaspInputPreparer::from_server(server, opts.keep_potcar);
    let cleaner = SlurmLogCleaner;

    let controller = Controller::new(
        &manager, &archiver, &preparer, &cleaner, printer, server, vasp_path,
    );
    let submit_opts = SubmitOptions {
        resources: UserResources {
            nodes: opts.nodes,
            time: opts.time,
        },
        queue: opts.queue,
        no_setup: opts.no_setup,
        local: opts.local,
        force: opts.force,
        max_jobs: opts.max_jobs,
    };
    let outcome = controller.run(&workdir, &submit_opts).await?;
    printer.print_outcome(&outcome);
    Ok(outcome.exit_code())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let opts = RootOptions::parse();
    setup_logging(opts.common.debug);
    let printer = make_printer(&opts.common);

    match command_submit(opts, printer.as_ref()).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            printer.print_error(e);
            std::process::exit(1);
        }
    }
}

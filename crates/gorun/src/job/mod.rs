//! Classification of a VASP working directory: is it composite, has it produced
//! output, and has it converged.

pub mod incar;
pub mod node;
pub mod vasprun;

pub use node::JobNode;

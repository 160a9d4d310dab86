use nom::character::complete::satisfy;
use nom::combinator::{all_consuming, map, map_res};
use nom::multi::many0;
use nom::sequence::tuple;
use nom::{AsChar, Finish, IResult};
use nom_supreme::error::ErrorTree;

pub type ParserError<'a> = ErrorTree<&'a str>;
pub type NomResult<'a, Ret> = IResult<&'a str, Ret, ParserError<'a>>;

/// Runs `parser` on `input` and fails unless the whole input was consumed.
pub fn consume_all<'a, O, F>(parser: F, input: &'a str) -> anyhow::Result<O>
where
    F: FnMut(&'a str) -> NomResult<'a, O>,
{
    all_consuming(parser)(input)
        .finish()
        .map(|(_, output)| output)
        .map_err(|error| anyhow::anyhow!("Parse error\n{error}"))
}

fn p_integer_string(input: &str) -> NomResult<String> {
    let parser = tuple((
        satisfy(|c| c.is_dec_digit()),
        many0(satisfy(|c| c.is_dec_digit() || c == '_')),
    ));
    map(parser, |(first, rest)| {
        let mut number = first.to_string();
        number.extend(rest.into_iter().filter(|c| c.is_dec_digit()));
        number
    })(input)
}

pub fn p_u32(input: &str) -> NomResult<u32> {
    map_res(p_integer_string, |number| number.parse::<u32>())(input)
}

pub fn p_u64(input: &str) -> NomResult<u64> {
    map_res(p_integer_string, |number| number.parse::<u64>())(input)
}

#[cfg(test)]
mod tests {
    use super::{consume_all, p_u32, p_u64};
    use nom::combinator::all_consuming;

    #[test]
    fn test_parse_u32() {
        assert_eq!(all_consuming(p_u32)("0").unwrap().1, 0);
        assert_eq!(all_consuming(p_u32)("1").unwrap().1, 1);
        assert_eq!(all_consuming(p_u32)("1019").unwrap().1, 1019);
    }

    #[test]
    fn test_parse_u32_empty() {
        assert!(all_consuming(p_u32)("").is_err());
    }

    #[test]
    fn test_parse_u32_invalid() {
        assert!(all_consuming(p_u32)("x").is_err());
    }

    #[test]
    fn test_parse_u32_underscores() {
        assert_eq!(all_consuming(p_u32)("100_100").unwrap().1, 100100);
    }

    #[test]
    fn test_parse_u64_overflow_u32() {
        assert_eq!(all_consuming(p_u64)("5000000000").unwrap().1, 5_000_000_000);
        assert!(all_consuming(p_u32)("5000000000").is_err());
    }

    #[test]
    fn test_consume_all_rejects_trailing_input() {
        assert!(consume_all(p_u32, "12x").is_err());
        assert_eq!(consume_all(p_u32, "12").unwrap(), 12);
    }
}

//! Command-line argument values

use fastosc_core::ArgValue;

/// Interpret one command-line word as a message argument
pub fn parse_arg(raw: &str) -> ArgValue {
    if let Some(text) = raw.strip_prefix("s:") {
        return ArgValue::String(text.to_string());
    }
    match raw {
        "true" => return ArgValue::Bool(true),
        "false" => return ArgValue::Bool(false),
        "nil" => return ArgValue::Nil,
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return ArgValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return ArgValue::Float(f);
        }
    }
    ArgValue::String(raw.to_string())
}

pub fn parse_args(raw: &[String]) -> Vec<ArgValue> {
    raw.iter().map(|s| parse_arg(s)).collect()
}

/// Render arguments the way a reply is printed
pub fn format_args(args: &[ArgValue]) -> String {
    args.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("42"), ArgValue::Int(42));
        assert_eq!(parse_arg("-3"), ArgValue::Int(-3));
        assert_eq!(parse_arg("0.5"), ArgValue::Float(0.5));
        assert_eq!(parse_arg("true"), ArgValue::Bool(true));
        assert_eq!(parse_arg("false"), ArgValue::Bool(false));
        assert_eq!(parse_arg("nil"), ArgValue::Nil);
        assert_eq!(parse_arg("volume"), ArgValue::String("volume".into()));
    }

    #[test]
    fn test_forced_string() {
        assert_eq!(parse_arg("s:42"), ArgValue::String("42".into()));
        assert_eq!(parse_arg("s:"), ArgValue::String(String::new()));
    }

    #[test]
    fn test_non_finite_stays_text() {
        assert_eq!(parse_arg("inf"), ArgValue::String("inf".into()));
        assert_eq!(parse_arg("NaN"), ArgValue::String("NaN".into()));
    }
}

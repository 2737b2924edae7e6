use crate::error::{ErrorKind, Result};

/// Replaces every `${VAR}`/`${VAR:-default}` token in `text` with the named
/// environment variable's value (or `default` when the variable is unset).
/// A bare `${VAR}` with no default and no such variable is an error; the
/// external loader this stands in for would otherwise hand the Dispatcher
/// a topology with a literal `${...}` string baked into a field no
/// downstream code expects.
///
/// Deliberately hand-rolled rather than pulled in via a templating crate:
/// the substitution grammar this module covers is exactly `${NAME}` and
/// `${NAME:-default}`, not general-purpose templating (no loops, no
/// conditionals, no includes).
pub fn substitute_env(text: &str) -> Result<String> {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if ch != '$' {
            output.push(ch);
            continue;
        }

        let Some(&(_, '{')) = chars.peek() else {
            output.push(ch);
            continue;
        };
        chars.next(); // consume '{'

        let start = index + 2;
        let mut end = None;
        for (token_index, token_ch) in chars.by_ref() {
            if token_ch == '}' {
                end = Some(token_index);
                break;
            }
        }
        let Some(end) = end else {
            return Err(error_stack::report!(ErrorKind::Substitution))
                .attach_printable(format!("unterminated '${{' starting at byte {index}"));
        };

        let token = &text[start..end];
        let (name, default) = match token.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (token, None),
        };

        match std::env::var(name) {
            Ok(value) => output.push_str(&value),
            Err(_) => match default {
                Some(default) => output.push_str(default),
                None => {
                    return Err(error_stack::report!(ErrorKind::Substitution))
                        .attach_printable(format!("environment variable '{name}' is not set"));
                }
            },
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_a_set_variable() {
        std::env::set_var("TOPOLOGY_CONFIG_TEST_VAR", "arm-01");
        let result = substitute_env("robot_name: ${TOPOLOGY_CONFIG_TEST_VAR}").unwrap();
        assert_eq!(result, "robot_name: arm-01");
        std::env::remove_var("TOPOLOGY_CONFIG_TEST_VAR");
    }

    #[test]
    fn falls_back_to_the_default_when_unset() {
        std::env::remove_var("TOPOLOGY_CONFIG_TEST_MISSING");
        let result = substitute_env("level: ${TOPOLOGY_CONFIG_TEST_MISSING:-INFO}").unwrap();
        assert_eq!(result, "level: INFO");
    }

    #[test]
    fn fails_on_a_missing_variable_with_no_default() {
        std::env::remove_var("TOPOLOGY_CONFIG_TEST_MISSING_2");
        assert!(substitute_env("x: ${TOPOLOGY_CONFIG_TEST_MISSING_2}").is_err());
    }

    #[test]
    fn leaves_text_without_tokens_untouched() {
        assert_eq!(substitute_env("plain text, no tokens").unwrap(), "plain text, no tokens");
    }
}

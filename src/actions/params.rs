//! `name(param=value, ...)` lists used to reference interactions and composites

use crate::error::{InputError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedValue {
    pub name: String,
    pub value: String,
}

/// One entry of a comma-separated reference list such as `hold(duration=0.8)`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameAndParameters {
    pub name: String,
    pub parameters: Vec<NamedValue>,
}

impl NameAndParameters {
    /// Parses a single entry
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (name, inner) = match text.find('(') {
            Some(open) => {
                let inner = text[open + 1..].strip_suffix(')').ok_or_else(|| {
                    InputError::invalid_parameter(text, "", "missing closing parenthesis")
                })?;
                (text[..open].trim(), Some(inner))
            }
            None => (text, None),
        };

        if name.is_empty() {
            return Err(InputError::invalid_parameter(text, "", "missing name"));
        }

        let mut parameters = Vec::new();
        for pair in inner.into_iter().flat_map(|s| s.split(',')) {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                InputError::invalid_parameter(name, pair, "expected 'name=value'")
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(InputError::invalid_parameter(name, pair, "missing parameter name"));
            }
            parameters.push(NamedValue {
                name: key.to_string(),
                value: value.trim().to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            parameters,
        })
    }

    /// Parses a comma-separated list; commas inside parentheses do not split
    pub fn parse_list(text: &str) -> Result<Vec<Self>> {
        let mut entries = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (i, c) in text.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    push_entry(&mut entries, &text[start..i])?;
                    start = i + 1;
                }
                _ => {}
            }
        }
        push_entry(&mut entries, &text[start..])?;
        Ok(entries)
    }

    /// Raw value of a parameter, matched case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.value.as_str())
    }

    pub fn f32(&self, name: &str) -> Result<Option<f32>> {
        self.get(name)
            .map(|v| {
                v.parse::<f32>().map_err(|_| {
                    InputError::invalid_parameter(&self.name, name, format!("'{v}' is not a number"))
                })
            })
            .transpose()
    }

    pub fn u32(&self, name: &str) -> Result<Option<u32>> {
        self.get(name)
            .map(|v| {
                v.parse::<u32>().map_err(|_| {
                    InputError::invalid_parameter(
                        &self.name,
                        name,
                        format!("'{v}' is not a non-negative integer"),
                    )
                })
            })
            .transpose()
    }

    /// Rejects parameters not named in `known`
    pub fn expect_only(&self, known: &[&str]) -> Result<()> {
        match self
            .parameters
            .iter()
            .find(|p| !known.iter().any(|k| k.eq_ignore_ascii_case(&p.name)))
        {
            Some(unknown) => Err(InputError::invalid_parameter(
                &self.name,
                &unknown.name,
                "unknown parameter",
            )),
            None => Ok(()),
        }
    }
}

fn push_entry(entries: &mut Vec<NameAndParameters>, text: &str) -> Result<()> {
    if !text.trim().is_empty() {
        entries.push(NameAndParameters::parse(text)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_name() {
        let parsed = NameAndParameters::parse(" tap ").unwrap();
        assert_eq!(parsed.name, "tap");
        assert!(parsed.parameters.is_empty());
    }

    #[test]
    fn test_parse_list_with_parameters() {
        let list =
            NameAndParameters::parse_list("hold(duration=0.8, pressPoint=0.3),tap").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "hold");
        assert_eq!(list[0].f32("DURATION").unwrap(), Some(0.8));
        assert_eq!(list[0].get("pressPoint"), Some("0.3"));
        assert_eq!(list[1].name, "tap");
    }

    #[test]
    fn test_empty_list() {
        assert!(NameAndParameters::parse_list("").unwrap().is_empty());
        assert!(NameAndParameters::parse_list(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_malformed() {
        assert!(NameAndParameters::parse("hold(duration=0.8").is_err());
        assert!(NameAndParameters::parse("hold(duration)").is_err());
        assert!(NameAndParameters::parse("(x=1)").is_err());

        let parsed = NameAndParameters::parse("hold(duration=long)").unwrap();
        assert!(parsed.f32("duration").is_err());
        assert!(parsed.expect_only(&["duration"]).is_ok());
        assert!(parsed.expect_only(&["pressPoint"]).is_err());
    }
}

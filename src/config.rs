use crate::AmgError;
use json::JsonValue;
use std::fmt;

/// Value stored in a [ParameterList]
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    List(ParameterList),
}

impl Parameter {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
            Self::List(_) => "sublist",
        }
    }
}

impl From<bool> for Parameter {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Parameter {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Parameter {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<usize> for Parameter {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Parameter {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Parameter {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Parameter {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<ParameterList> for Parameter {
    fn from(v: ParameterList) -> Self {
        Self::List(v)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{:e}", v),
            Self::Str(v) => write!(f, "\"{}\"", v),
            Self::List(l) => write!(f, "[{} entries]", l.len()),
        }
    }
}

/// Ordered, nested list of named parameters
///
/// Getters take a default which is returned when the key is missing; a key that exists with
/// the wrong type is a configuration error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterList {
    name: String,
    entries: Vec<(String, Parameter)>,
}

impl ParameterList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Set (or overwrite) a parameter
    pub fn set(&mut self, key: &str, value: impl Into<Parameter>) -> &mut Self {
        let value = value.into();
        match self.get_mut(key) {
            Some(current) => *current = value,
            None => self.entries.push((key.to_owned(), value)),
        }
        self
    }

    /// Builder-style [ParameterList::set]
    pub fn with(mut self, key: &str, value: impl Into<Parameter>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Parameter> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut Parameter> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Parameter> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn is_sublist(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Parameter::List(_)))
    }

    pub fn sublist(&self, key: &str) -> Option<&ParameterList> {
        match self.get(key) {
            Some(Parameter::List(l)) => Some(l),
            _ => None,
        }
    }

    /// Get a sublist, creating an empty one if the key does not exist yet
    pub fn sublist_mut(&mut self, key: &str) -> Result<&mut ParameterList, AmgError> {
        if !self.contains(key) {
            self.entries
                .push((key.to_owned(), Parameter::List(ParameterList::new(key))));
        }

        let name = self.name.clone();
        match self.get_mut(key) {
            Some(Parameter::List(l)) => Ok(l),
            _ => Err(AmgError::config(format!(
                "parameter '{}' in '{}' is not a sublist",
                key, name
            ))),
        }
    }

    fn type_error(&self, key: &str, found: &Parameter, expected: &str) -> AmgError {
        AmgError::config(format!(
            "parameter '{}' in '{}' has type {}, expected {}",
            key,
            self.name,
            found.type_name(),
            expected
        ))
    }

    pub fn get_int_opt(&self, key: &str) -> Result<Option<i64>, AmgError> {
        match self.get(key) {
            None => Ok(None),
            Some(Parameter::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(self.type_error(key, other, "int")),
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, AmgError> {
        Ok(self.get_int_opt(key)?.unwrap_or(default))
    }

    /// Non-negative integer parameter
    pub fn get_usize(&self, key: &str, default: usize) -> Result<usize, AmgError> {
        match self.get_int_opt(key)? {
            None => Ok(default),
            Some(v) => usize::try_from(v).map_err(|_| {
                AmgError::config(format!(
                    "parameter '{}' in '{}' must not be negative (found {})",
                    key, self.name, v
                ))
            }),
        }
    }

    /// Floating point parameter; integer values are accepted
    pub fn get_double(&self, key: &str, default: f64) -> Result<f64, AmgError> {
        match self.get(key) {
            None => Ok(default),
            Some(Parameter::Double(v)) => Ok(*v),
            Some(Parameter::Int(v)) => Ok(*v as f64),
            Some(other) => Err(self.type_error(key, other, "double")),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, AmgError> {
        match self.get(key) {
            None => Ok(default),
            Some(Parameter::Bool(v)) => Ok(*v),
            Some(other) => Err(self.type_error(key, other, "bool")),
        }
    }

    pub fn get_str(&self, key: &str, default: &str) -> Result<String, AmgError> {
        match self.get(key) {
            None => Ok(default.to_owned()),
            Some(Parameter::Str(v)) => Ok(v.clone()),
            Some(other) => Err(self.type_error(key, other, "string")),
        }
    }

    /// Parse a parameter list from the text of a JSON object
    pub fn from_json_str(name: &str, text: &str) -> Result<Self, AmgError> {
        let value = json::parse(text)
            .map_err(|e| AmgError::config(format!("unable to parse '{}' as JSON: {}", name, e)))?;
        Self::from_json(name, &value)
    }

    /// Objects become sublists; integral numbers become [Parameter::Int]
    pub fn from_json(name: &str, value: &JsonValue) -> Result<Self, AmgError> {
        if !value.is_object() {
            return Err(AmgError::config(format!(
                "parameter list '{}' must be a JSON object",
                name
            )));
        }

        let mut list = Self::new(name);
        for (key, entry) in value.entries() {
            let param = if entry.is_object() {
                Parameter::List(Self::from_json(key, entry)?)
            } else if let Some(b) = entry.as_bool() {
                Parameter::Bool(b)
            } else if let Some(s) = entry.as_str() {
                Parameter::Str(s.to_owned())
            } else if let Some(x) = entry.as_f64() {
                if x.fract() == 0.0 && x.abs() < 9.0e15 {
                    Parameter::Int(x as i64)
                } else {
                    Parameter::Double(x)
                }
            } else {
                return Err(AmgError::config(format!(
                    "parameter '{}' in '{}' has an unsupported JSON type",
                    key, name
                )));
            };
            list.set(key, param);
        }

        Ok(list)
    }

    pub fn to_json(&self) -> JsonValue {
        let mut obj = JsonValue::new_object();
        for (key, value) in self.entries.iter() {
            obj[key.as_str()] = match value {
                Parameter::Bool(v) => (*v).into(),
                Parameter::Int(v) => (*v).into(),
                Parameter::Double(v) => (*v).into(),
                Parameter::Str(v) => v.as_str().into(),
                Parameter::List(l) => l.to_json(),
            };
        }
        obj
    }

    fn write_indented(&self, f: &mut fmt::Formatter, indent: usize) -> fmt::Result {
        for (key, value) in self.entries.iter() {
            match value {
                Parameter::List(l) => {
                    writeln!(f, "{:indent$}{} ->", "", key, indent = indent)?;
                    l.write_indented(f, indent + 2)?;
                }
                other => writeln!(f, "{:indent$}{} = {}", "", key, other, indent = indent)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for ParameterList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const PARAMS: &str = r#"{
        "AMGBS Parameters": {
            "max levels": 4,
            "aggregation: type": "MIS",
            "aggregation: threshold": 0.05,
            "aggregation: damping factor": 1,
            "amgbs: smoother: pre or post": "pre",
            "braess-sarazin: list (level 1)": { "braess-sarazin: sweeps": 3 }
        },
        "verbose": true
    }"#;

    #[test]
    fn parse_nested_json() {
        let params = ParameterList::from_json_str("params", PARAMS).unwrap();
        let amgbs = params.sublist("AMGBS Parameters").unwrap();

        assert_eq!(amgbs.get_int("max levels", 6).unwrap(), 4);
        assert_eq!(amgbs.get_str("aggregation: type", "Uncoupled").unwrap(), "MIS");
        assert!((amgbs.get_double("aggregation: threshold", 0.0).unwrap() - 0.05).abs() < 1e-15);
        assert!((amgbs.get_double("aggregation: damping factor", 0.0).unwrap() - 1.0).abs() < 1e-15);
        assert_eq!(amgbs.get_int("max coarse dimension", 20).unwrap(), 20);
        assert!(amgbs.is_sublist("braess-sarazin: list (level 1)"));
        assert!(params.get_bool("verbose", false).unwrap());
    }

    #[test]
    fn type_mismatch_is_config_error() {
        let params = ParameterList::new("p").with("max levels", "six");

        let err = params.get_int("max levels", 6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(params.get_usize("missing", 3).is_ok());
    }

    #[test]
    fn negative_count_rejected() {
        let params = ParameterList::new("p").with("max levels", -1);
        assert!(params.get_usize("max levels", 6).is_err());
    }

    #[test]
    fn arrays_are_rejected() {
        let res = ParameterList::from_json_str("p", r#"{ "nullspace": [1, 2] }"#);
        assert!(res.is_err());
        assert!(ParameterList::from_json_str("p", "[1]").is_err());
    }

    #[test]
    fn sublist_creation_and_overwrite() {
        let mut params = ParameterList::new("p");
        params
            .sublist_mut("IFPACK Parameters")
            .unwrap()
            .set("fact: level-of-fill", 0);
        params.set("ML output", 3);
        params.set("ML output", 10);

        assert_eq!(params.len(), 2);
        assert_eq!(params.get_int("ML output", 0).unwrap(), 10);
        assert!(params.sublist_mut("ML output").is_err());
        assert_eq!(params.remove("ML output"), Some(Parameter::Int(10)));
    }

    #[test]
    fn nested_sublist_is_edited_in_place() {
        let mut params = ParameterList::from_json_str("params", PARAMS).unwrap();
        params
            .sublist_mut("AMGBS Parameters")
            .unwrap()
            .sublist_mut("braess-sarazin: list (level 1)")
            .unwrap()
            .set("braess-sarazin: sweeps", 5);

        let level = params
            .sublist("AMGBS Parameters")
            .and_then(|l| l.sublist("braess-sarazin: list (level 1)"))
            .unwrap();
        assert_eq!(level.get_int("braess-sarazin: sweeps", 1).unwrap(), 5);

        let err = params
            .sublist_mut("AMGBS Parameters")
            .unwrap()
            .sublist_mut("max levels")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("'max levels' in 'AMGBS Parameters'"));
    }

    #[test]
    fn json_export_round_trip() {
        let params = ParameterList::from_json_str("params", PARAMS).unwrap();
        let again = ParameterList::from_json("params", &params.to_json()).unwrap();

        assert_eq!(params, again);
        assert!(params.to_string().contains("max levels = 4"));
    }
}

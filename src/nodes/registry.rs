use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::http_client::HttpMethod;

/// How a method is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    JsonRpc,
    Http,
    /// Computed locally from the node's `value` binding.
    Custom,
}

/// JSON-RPC params layout for methods with declared fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamsShape {
    /// `params` is an object keyed by field name.
    #[default]
    Named,
    /// `params` is an array in declared field order.
    Positional,
}

/// A declared parameter field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Free-form type hint for editors (`string`, `u64`, `object`, ...).
    #[serde(default)]
    pub type_hint: String,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: type_hint.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: type_hint.into(),
            required: false,
        }
    }
}

/// HTTP routing for `http` methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpEndpoint {
    pub method: HttpMethod,
    /// Path with `{token}` placeholders filled from parameters.
    pub path_template: String,
    /// Network name -> base URL.
    pub base_urls: HashMap<String, String>,
}

impl HttpEndpoint {
    /// Base URL for `network`, falling back to `default` and then to the only
    /// configured entry.
    pub fn base_url(&self, network: &str) -> Option<&str> {
        if let Some(url) = self.base_urls.get(network) {
            return Some(url);
        }
        if let Some(url) = self.base_urls.get("default") {
            return Some(url);
        }
        if self.base_urls.len() == 1 {
            return self.base_urls.values().next().map(String::as_str);
        }
        None
    }

    /// Placeholder names in `path_template`, in order.
    pub fn path_tokens(&self) -> Vec<&str> {
        let mut tokens = Vec::new();
        let mut rest = self.path_template.as_str();
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            tokens.push(&rest[open + 1..open + close]);
            rest = &rest[open + close + 1..];
        }
        tokens
    }
}

/// Registry entry for one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    /// Declared fields; `None` means the schema is unknown and nodes take raw
    /// JSON params.
    pub fields: Option<Vec<FieldSpec>>,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub params_shape: ParamsShape,
    #[serde(default)]
    pub http: Option<HttpEndpoint>,
}

impl MethodSpec {
    pub fn jsonrpc(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields: Some(fields),
            transport: TransportKind::JsonRpc,
            params_shape: ParamsShape::Named,
            http: None,
        }
    }

    pub fn raw(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: None,
            transport: TransportKind::JsonRpc,
            params_shape: ParamsShape::Named,
            http: None,
        }
    }

    pub fn http(name: impl Into<String>, endpoint: HttpEndpoint, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields: Some(fields),
            transport: TransportKind::Http,
            params_shape: ParamsShape::Named,
            http: Some(endpoint),
        }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Some(vec![FieldSpec::optional("value", "any")]),
            transport: TransportKind::Custom,
            params_shape: ParamsShape::Named,
            http: None,
        }
    }

    pub fn positional(mut self) -> Self {
        self.params_shape = ParamsShape::Positional;
        self
    }

    pub fn is_known(&self) -> bool {
        self.fields.is_some()
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().flatten().filter(|field| field.required)
    }
}

/// Catalog of callable methods. The runtime only reads from it.
pub trait MethodRegistry: Send + Sync {
    fn lookup(&self, method: &str) -> Option<MethodSpec>;

    fn contains(&self, method: &str) -> bool {
        self.lookup(method).is_some()
    }
}

/// In-memory [`MethodRegistry`].
#[derive(Debug, Clone, Default)]
pub struct StaticMethodRegistry {
    methods: HashMap<String, MethodSpec>,
}

impl StaticMethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: MethodSpec) {
        self.methods.insert(spec.name.clone(), spec);
    }

    pub fn with(mut self, spec: MethodSpec) -> Self {
        self.register(spec);
        self
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let specs: Vec<MethodSpec> = serde_json::from_str(text)?;
        Ok(specs.into_iter().fold(Self::new(), Self::with))
    }

    pub fn registered_methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }
}

impl MethodRegistry for StaticMethodRegistry {
    fn lookup(&self, method: &str) -> Option<MethodSpec> {
        self.methods.get(method).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> HttpEndpoint {
        HttpEndpoint {
            method: HttpMethod::Get,
            path_template: "/v1/accounts/{address}/tx/{signature}".into(),
            base_urls: HashMap::from([
                ("mainnet".to_string(), "https://api.example.com".to_string()),
                ("devnet".to_string(), "https://dev.example.com".to_string()),
            ]),
        }
    }

    #[test]
    fn test_path_tokens() {
        assert_eq!(endpoint().path_tokens(), vec!["address", "signature"]);
    }

    #[test]
    fn test_base_url_selection() {
        let ep = endpoint();
        assert_eq!(ep.base_url("devnet"), Some("https://dev.example.com"));
        assert_eq!(ep.base_url("testnet"), None);

        let single = HttpEndpoint {
            base_urls: HashMap::from([("x".to_string(), "https://only".to_string())]),
            ..endpoint()
        };
        assert_eq!(single.base_url("testnet"), Some("https://only"));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = StaticMethodRegistry::new()
            .with(MethodSpec::jsonrpc(
                "getBalance",
                vec![FieldSpec::required("pubkey", "string")],
            ))
            .with(MethodSpec::raw("getFoo"));
        assert!(registry.contains("getBalance"));
        assert!(!registry.contains("getBar"));
        let spec = registry.lookup("getBalance").unwrap();
        assert!(spec.is_known());
        assert_eq!(spec.required_fields().count(), 1);
        assert!(!registry.lookup("getFoo").unwrap().is_known());
        assert_eq!(registry.registered_methods(), vec!["getBalance", "getFoo"]);
    }

    #[test]
    fn test_registry_from_json() {
        let registry = StaticMethodRegistry::from_json(
            r#"[
                {"name": "getSlot", "fields": []},
                {"name": "echo", "fields": [{"name": "value"}], "transport": "custom"}
            ]"#,
        )
        .unwrap();
        assert_eq!(registry.lookup("echo").unwrap().transport, TransportKind::Custom);
        assert_eq!(registry.lookup("getSlot").unwrap().transport, TransportKind::JsonRpc);
    }
}

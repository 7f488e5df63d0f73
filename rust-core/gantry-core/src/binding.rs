//! # Request Binding
//!
//! Decode a JSON request body into a typed value and validate it.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::json::parse_json_bytes;
use crate::validation::Validate;
use serde::de::DeserializeOwned;
use tracing::debug;

impl Context<'_> {
    /// Decode the body as JSON into `T` and validate it
    ///
    /// # Errors
    ///
    /// `Error::Bind` for a missing or malformed body, `Error::Validation`
    /// when `T::validate` rejects the value.
    pub fn should_bind_json<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Validate,
    {
        let mut bytes = match self.request().body_bytes() {
            Some(body) if !body.is_empty() => body.to_vec(),
            _ => {
                return Err(Error::Bind {
                    message: "empty request body".to_string(),
                })
            }
        };
        let value: T = parse_json_bytes(&mut bytes)?;
        value.validate().map_err(Error::Validation)?;
        Ok(value)
    }

    /// Like [`Context::should_bind_json`], but answers the request on failure
    ///
    /// A decode failure becomes `fail(400, message)`. A validation failure
    /// aborts with status 400 and the field errors as the JSON body.
    /// Returns `None` in both cases; the handler should just return.
    pub fn bind_json<T>(&mut self) -> Option<T>
    where
        T: DeserializeOwned + Validate,
    {
        match self.should_bind_json() {
            Ok(value) => Some(value),
            Err(Error::Validation(errors)) => {
                debug!(path = %self.path(), errors = errors.len(), "Body failed validation");
                self.abort();
                self.response_mut().clear_body();
                self.json(400, &errors);
                None
            }
            Err(err) => {
                debug!(path = %self.path(), error = %err, "Body failed to bind");
                self.fail(400, err.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::context::handler;
    use crate::engine::Engine;
    use crate::request::Request;
    use crate::router::Method;
    use crate::validation::{Validate, ValidationErrors, ValidationResult};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct NewUser {
        name: String,
        age: u32,
    }

    impl Validate for NewUser {
        fn validate(&self) -> ValidationResult<()> {
            let mut errors = ValidationErrors::new();
            if self.name.is_empty() {
                errors.add_required("name");
            }
            if errors.is_empty() {
                Ok(())
            } else {
                Err(errors)
            }
        }
    }

    fn engine() -> Engine {
        let mut engine = Engine::new();
        engine.post("/users", |c| {
            let Some(user) = c.bind_json::<NewUser>() else {
                return;
            };
            let body = format!("{}:{}", user.name, user.age);
            c.string(201, body);
        });
        engine
    }

    fn post(engine: &Engine, body: &'static str) -> crate::response::Response {
        engine.handle(Request::new(Method::Post, "/users").with_body(body))
    }

    #[test]
    fn test_bind_success() {
        let resp = post(&engine(), r#"{"name":"ada","age":36}"#);
        assert_eq!(resp.status(), 201);
        assert_eq!(resp.body_string(), "ada:36");
    }

    #[test]
    fn test_bind_malformed_is_400() {
        let resp = post(&engine(), "{not json");
        assert_eq!(resp.status(), 400);
        assert!(resp.body_string().starts_with(r#"{"message":"Bind error"#));
    }

    #[test]
    fn test_bind_validation_is_400_with_fields() {
        let resp = post(&engine(), r#"{"name":"","age":1}"#);
        assert_eq!(resp.status(), 400);
        let body = resp.body_string();
        assert!(body.contains(r#""field":"name""#));
        assert!(body.contains("REQUIRED"));
    }

    #[test]
    fn test_bind_missing_body() {
        let mut engine = Engine::new();
        engine.post("/raw", |c| {
            let err = c.should_bind_json::<serde_json::Value>().unwrap_err();
            c.string(200, err.to_string());
        });
        engine.no_route(vec![handler(|_| {})]);
        let resp = engine.handle(Request::new(Method::Post, "/raw"));
        assert_eq!(resp.body_string(), "Bind error: empty request body");
    }
}

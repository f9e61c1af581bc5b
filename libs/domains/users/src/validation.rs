//! Schema-driven validation of untrusted request payloads.
//!
//! A payload is a parsed JSON value. Each [`Schema`] declares which fields it
//! accepts and whether they are required; the [`InputValidator`] checks
//! presence and type itself, then runs the `validator` derive rules on the
//! collected strings, then the configurable password policy. Every field is
//! inspected before anything is returned, so a rejection lists every problem
//! at once, ordered by the schema's field order.
//!
//! Nothing in a payload is ever interpreted: values are only classified and
//! copied into the typed value objects in [`crate::models`].

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use validator::{Validate, ValidationError};
use zeroize::Zeroize;

use crate::hasher::MAX_PLAINTEXT_CHARS;
use crate::models::{Credentials, LoginId, NamePrefix, NewUser, Password, UserName, UserUpdate};

/// Field name used for problems with the payload as a whole
pub const PAYLOAD_FIELD: &str = "body";
/// Field name reported for an invalid search prefix
pub const NAME_PREFIX_FIELD: &str = "name_prefix";

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_LOGIN_CHARS: usize = 255;

/// Machine-stable reason codes
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Reason {
    /// Declared required field missing or null
    Required,
    /// Present but not a string
    InvalidType,
    /// Empty once surrounding whitespace is removed
    Blank,
    TooShort,
    TooLong,
    InvalidEmail,
    /// Field not declared by the schema (reject policy)
    UnknownField,
    /// Payload is not a JSON object
    NotAnObject,
    /// Update payload carries no recognised field
    Empty,
    /// A rule failed with a code this module does not know
    Invalid,
}

/// One (field, reason) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: Reason,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: Reason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }
}

/// Ordered, non-empty set of field errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn single(field: impl Into<String>, reason: Reason) -> Self {
        Self(vec![FieldError::new(field, reason)])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str, reason: Reason) -> bool {
        self.0.iter().any(|e| e.field == field && e.reason == reason)
    }

    /// Reasons reported for `field`, in order
    pub fn reasons_for(&self, field: &str) -> Vec<Reason> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.reason)
            .collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", error.field, error.reason)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FieldErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// What to do with payload keys a schema does not declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFieldPolicy {
    #[default]
    Reject,
    Ignore,
}

impl UnknownFieldPolicy {
    pub fn from_allow_flag(allow_unknown_fields: bool) -> Self {
        if allow_unknown_fields {
            UnknownFieldPolicy::Ignore
        } else {
            UnknownFieldPolicy::Reject
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldName {
    Name,
    Login,
    Password,
}

impl FieldName {
    fn as_str(self) -> &'static str {
        match self {
            FieldName::Name => "name",
            FieldName::Login => "login",
            FieldName::Password => "password",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: FieldName,
    required: bool,
}

const fn required(name: FieldName) -> FieldSpec {
    FieldSpec { name, required: true }
}

const fn optional(name: FieldName) -> FieldSpec {
    FieldSpec { name, required: false }
}

const CREATE_USER_FIELDS: &[FieldSpec] = &[
    required(FieldName::Name),
    required(FieldName::Login),
    required(FieldName::Password),
];

const UPDATE_USER_FIELDS: &[FieldSpec] = &[
    optional(FieldName::Name),
    optional(FieldName::Login),
    optional(FieldName::Password),
];

const AUTHENTICATE_FIELDS: &[FieldSpec] = &[required(FieldName::Login), required(FieldName::Password)];

/// Payload schemas, one per domain operation that takes a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Schema {
    CreateUser,
    UpdateUser,
    Authenticate,
}

impl Schema {
    fn fields(self) -> &'static [FieldSpec] {
        match self {
            Schema::CreateUser => CREATE_USER_FIELDS,
            Schema::UpdateUser => UPDATE_USER_FIELDS,
            Schema::Authenticate => AUTHENTICATE_FIELDS,
        }
    }

    /// Declared field names, in reporting order
    pub fn field_names(self) -> Vec<&'static str> {
        self.fields().iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Whether the configured minimum password length applies.
    /// Login attempts are only bounded, so the policy is not revealed there.
    fn enforces_password_policy(self) -> bool {
        !matches!(self, Schema::Authenticate)
    }
}

/// Typed outcome of a successful [`InputValidator::validate`]
#[derive(Debug, Clone)]
pub enum Payload {
    CreateUser(NewUser),
    UpdateUser(UserUpdate),
    Authenticate(Credentials),
}

/// String fields collected from a payload, before and after rule checks.
#[derive(Default, Validate)]
struct UserInput {
    #[validate(custom(function = "validate_name"))]
    name: Option<String>,
    #[validate(
        email(code = "invalid_email"),
        length(max = 255, code = "too_long")
    )]
    login: Option<String>,
    #[validate(length(max = 256, code = "too_long"))]
    password: Option<String>,
}

impl UserInput {
    fn set(&mut self, field: FieldName, value: &str) {
        match field {
            FieldName::Name => self.name = Some(value.trim().to_string()),
            FieldName::Login => self.login = Some(value.trim().to_lowercase()),
            FieldName::Password => self.password = Some(value.to_string()),
        }
    }
}

impl Drop for UserInput {
    fn drop(&mut self) {
        if let Some(password) = self.password.as_mut() {
            password.zeroize();
        }
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new("blank"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::new("too_long"));
    }
    Ok(())
}

/// Converts raw payloads into typed values or a complete list of violations.
#[derive(Debug, Clone, Copy)]
pub struct InputValidator {
    min_password_length: usize,
    unknown_fields: UnknownFieldPolicy,
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new(8, UnknownFieldPolicy::Reject)
    }
}

impl InputValidator {
    /// `min_password_length` is clamped to what the hasher accepts.
    pub fn new(min_password_length: usize, unknown_fields: UnknownFieldPolicy) -> Self {
        Self {
            min_password_length: min_password_length.clamp(1, MAX_PLAINTEXT_CHARS),
            unknown_fields,
        }
    }

    pub fn min_password_length(&self) -> usize {
        self.min_password_length
    }

    pub fn unknown_field_policy(&self) -> UnknownFieldPolicy {
        self.unknown_fields
    }

    /// Validate `raw` against `schema`.
    pub fn validate(&self, raw: &Value, schema: Schema) -> Result<Payload, FieldErrors> {
        match schema {
            Schema::CreateUser => self.validate_create(raw).map(Payload::CreateUser),
            Schema::UpdateUser => self.validate_update(raw).map(Payload::UpdateUser),
            Schema::Authenticate => self.validate_credentials(raw).map(Payload::Authenticate),
        }
    }

    pub fn validate_create(&self, raw: &Value) -> Result<NewUser, FieldErrors> {
        let mut input = self.collect(raw, Schema::CreateUser)?;

        match (input.name.take(), input.login.take(), input.password.take()) {
            (Some(name), Some(login), Some(password)) => Ok(NewUser {
                name: UserName::new_validated(name),
                login: LoginId::new_validated(login),
                password: Password::new_validated(password),
            }),
            _ => Err(FieldErrors::single(PAYLOAD_FIELD, Reason::Invalid)),
        }
    }

    pub fn validate_update(&self, raw: &Value) -> Result<UserUpdate, FieldErrors> {
        let mut input = self.collect(raw, Schema::UpdateUser)?;

        Ok(UserUpdate {
            name: input.name.take().map(UserName::new_validated),
            login: input.login.take().map(LoginId::new_validated),
            password: input.password.take().map(Password::new_validated),
        })
    }

    pub fn validate_credentials(&self, raw: &Value) -> Result<Credentials, FieldErrors> {
        let mut input = self.collect(raw, Schema::Authenticate)?;

        match (input.login.take(), input.password.take()) {
            (Some(login), Some(password)) => Ok(Credentials {
                login: LoginId::new_validated(login),
                password: Password::new_validated(password),
            }),
            _ => Err(FieldErrors::single(PAYLOAD_FIELD, Reason::Invalid)),
        }
    }

    /// Validate a search prefix. The empty prefix is valid (it matches nothing).
    pub fn validate_name_prefix(&self, raw: &str) -> Result<NamePrefix, FieldErrors> {
        if raw.chars().count() > MAX_NAME_CHARS {
            return Err(FieldErrors::single(NAME_PREFIX_FIELD, Reason::TooLong));
        }
        Ok(NamePrefix::new_validated(raw.to_string()))
    }

    fn collect(&self, raw: &Value, schema: Schema) -> Result<UserInput, FieldErrors> {
        let Some(object) = raw.as_object() else {
            return Err(FieldErrors::single(PAYLOAD_FIELD, Reason::NotAnObject));
        };

        let specs = schema.fields();
        let mut errors = Vec::new();
        let mut input = UserInput::default();
        let mut present = 0;

        if self.unknown_fields == UnknownFieldPolicy::Reject {
            errors.extend(
                object
                    .keys()
                    .filter(|key| !specs.iter().any(|spec| spec.name.as_str() == key.as_str()))
                    .map(|key| FieldError::new(key.as_str(), Reason::UnknownField)),
            );
        }

        for spec in specs {
            let name = spec.name.as_str();
            match object.get(name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        errors.push(FieldError::new(name, Reason::Required));
                    }
                }
                Some(Value::String(value)) => {
                    present += 1;
                    input.set(spec.name, value);
                }
                Some(_) => {
                    present += 1;
                    errors.push(FieldError::new(name, Reason::InvalidType));
                }
            }
        }

        if schema == Schema::UpdateUser && present == 0 {
            errors.push(FieldError::new(PAYLOAD_FIELD, Reason::Empty));
        }

        if let Err(report) = input.validate() {
            for (field, failures) in report.field_errors() {
                for failure in failures.iter() {
                    let reason = failure.code.parse().unwrap_or(Reason::Invalid);
                    errors.push(FieldError::new(field.to_string(), reason));
                }
            }
        }

        if schema.enforces_password_policy()
            && let Some(password) = input.password.as_deref()
            && password.chars().count() < self.min_password_length
        {
            errors.push(FieldError::new(FieldName::Password.as_str(), Reason::TooShort));
        }

        if errors.is_empty() {
            Ok(input)
        } else {
            Err(order(errors, specs, object))
        }
    }
}

/// Schema fields first (declaration order), then unknown keys, then the
/// payload-level entry; reasons ascending within a field.
fn order(mut errors: Vec<FieldError>, specs: &[FieldSpec], object: &Map<String, Value>) -> FieldErrors {
    let rank = |field: &str| -> usize {
        if let Some(pos) = specs.iter().position(|spec| spec.name.as_str() == field) {
            pos
        } else if object.contains_key(field) {
            specs.len()
        } else {
            specs.len() + 1
        }
    };

    errors.sort_by(|a, b| {
        rank(&a.field)
            .cmp(&rank(&b.field))
            .then_with(|| a.field.cmp(&b.field))
            .then_with(|| a.reason.cmp(&b.reason))
    });
    errors.dedup();

    FieldErrors(errors)
}

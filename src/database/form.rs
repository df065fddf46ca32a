use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use super::{
    error::{Error, HtmlError, ValidationErrors},
    schema::Id,
};

pub type FormData = Map<String, Value>;

const REQUIRED: &str = "This field is required.";
const NULL: &str = "This field may not be null.";
const BLANK: &str = "This field may not be blank.";

/// A request body decoded into a JSON object.
#[derive(Debug, Clone, Default)]
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    /// Decodes a request body. An empty body is an empty form.
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| HtmlError::InvalidRequest.new(&format!("JSON parse error - {e}")))?;

        match value {
            Value::Object(data) => Ok(Self::from_data(data)),
            other => Err(ValidationErrors::single(
                "non_field_errors",
                &format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(&other)
                ),
            )
            .into()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn reader(&self, partial: bool) -> FieldReader<'_> {
        FieldReader {
            form: self,
            partial,
            errors: ValidationErrors::new(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Constraints for a text field.
#[derive(Debug, Clone, Copy)]
pub struct Text {
    required: bool,
    allow_blank: bool,
    trim: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl Text {
    pub const fn required() -> Self {
        Self {
            required: true,
            allow_blank: false,
            trim: true,
            min_length: None,
            max_length: None,
        }
    }

    pub const fn optional() -> Self {
        Self {
            required: false,
            allow_blank: true,
            trim: true,
            min_length: None,
            max_length: None,
        }
    }

    pub const fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    pub const fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    pub const fn untrimmed(mut self) -> Self {
        self.trim = false;
        self
    }
}

/// Reads typed fields out of a [`Form`], collecting every problem before
/// failing so the client sees all field errors at once.
///
/// With `partial` set, missing required fields are not an error.
pub struct FieldReader<'a> {
    form: &'a Form,
    partial: bool,
    errors: ValidationErrors,
}

impl<'a> FieldReader<'a> {
    fn missing(&mut self, key: &str, required: bool) {
        if required && !self.partial {
            self.errors.add(key, REQUIRED);
        }
    }

    pub fn text(&mut self, key: &str, rules: Text) -> Option<String> {
        let form = self.form;
        let value = match form.get(key) {
            None => {
                self.missing(key, rules.required);
                return None;
            }
            Some(value) => value,
        };

        let raw = match value {
            Value::String(s) => s.to_owned(),
            Value::Number(n) => n.to_string(),
            Value::Null => {
                self.errors.add(key, NULL);
                return None;
            }
            _ => {
                self.errors.add(key, "Not a valid string.");
                return None;
            }
        };
        let text = if rules.trim {
            raw.trim().to_string()
        } else {
            raw
        };

        if text.is_empty() && !rules.allow_blank {
            self.errors.add(key, BLANK);
            return None;
        }

        let length = text.chars().count();
        if let Some(max) = rules.max_length {
            if length > max {
                self.errors.add(
                    key,
                    &format!("Ensure this field has no more than {max} characters."),
                );
                return None;
            }
        }
        if let Some(min) = rules.min_length {
            if length < min {
                self.errors
                    .add(key, &format!("Ensure this field has at least {min} characters."));
                return None;
            }
        }

        Some(text)
    }

    pub fn email(&mut self, key: &str, required: bool) -> Option<String> {
        let rules = if required {
            Text::required()
        } else {
            Text::optional()
        };
        let email = self.text(key, rules.max_length(255))?;

        if !is_valid_email(&email) {
            self.errors.add(key, "Enter a valid email address.");
            return None;
        }

        Some(email)
    }

    pub fn integer(&mut self, key: &str, required: bool) -> Option<i32> {
        let form = self.form;
        let value = match form.get(key) {
            None => {
                self.missing(key, required);
                return None;
            }
            Some(Value::Null) => {
                self.errors.add(key, NULL);
                return None;
            }
            Some(value) => value,
        };

        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        match parsed {
            None => {
                self.errors.add(key, "A valid integer is required.");
                None
            }
            Some(n) if n > i64::from(i32::MAX) => {
                self.errors.add(
                    key,
                    &format!("Ensure this value is less than or equal to {}.", i32::MAX),
                );
                None
            }
            Some(n) if n < i64::from(i32::MIN) => {
                self.errors.add(
                    key,
                    &format!("Ensure this value is greater than or equal to {}.", i32::MIN),
                );
                None
            }
            Some(n) => i32::try_from(n).ok(),
        }
    }

    pub fn decimal(
        &mut self,
        key: &str,
        required: bool,
        max_digits: u32,
        decimal_places: u32,
    ) -> Option<Decimal> {
        let form = self.form;
        let value = match form.get(key) {
            None => {
                self.missing(key, required);
                return None;
            }
            Some(Value::Null) => {
                self.errors.add(key, NULL);
                return None;
            }
            Some(value) => value,
        };

        let parsed = match value {
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        };
        let Some(decimal) = parsed else {
            self.errors.add(key, "A valid number is required.");
            return None;
        };

        if let Err(message) = check_digits(decimal, max_digits, decimal_places) {
            self.errors.add(key, &message);
            return None;
        }

        let mut decimal = decimal;
        decimal.rescale(decimal_places);
        Some(decimal)
    }

    /// A list of `{"name": ...}` objects, as sent for nested tags and ingredients.
    pub fn named_list(&mut self, key: &str) -> Option<Vec<String>> {
        let form = self.form;
        let items = match form.get(key)? {
            Value::Array(items) => items,
            Value::Null => {
                self.errors.add(key, NULL);
                return None;
            }
            other => {
                self.errors.add(
                    key,
                    &format!(
                        "Expected a list of items but got type \"{}\".",
                        json_type_name(other)
                    ),
                );
                return None;
            }
        };

        let mut names = Vec::with_capacity(items.len());
        let mut item_errors = Vec::with_capacity(items.len());
        let mut failed = false;

        for item in items {
            let Value::Object(data) = item else {
                failed = true;
                item_errors.push(json!({
                    "non_field_errors": [format!(
                        "Invalid data. Expected a dictionary, but got {}.",
                        json_type_name(item)
                    )]
                }));
                continue;
            };

            let item_form = Form::from_data(data.to_owned());
            let mut reader = item_form.reader(false);
            let name = reader.text("name", Text::required().max_length(255));
            match (name, reader.finish_details()) {
                (Some(name), None) => {
                    names.push(name);
                    item_errors.push(json!({}));
                }
                (_, details) => {
                    failed = true;
                    item_errors.push(details.unwrap_or_else(|| json!({})));
                }
            }
        }

        if failed {
            self.errors.add_nested(key, item_errors);
            return None;
        }

        Some(names)
    }

    fn finish_details(self) -> Option<Value> {
        match self.errors.into_result() {
            Ok(()) => None,
            Err(error) => error.details,
        }
    }

    pub fn finish(self) -> Result<(), Error> {
        self.errors.into_result()
    }
}

fn check_digits(decimal: Decimal, max_digits: u32, decimal_places: u32) -> Result<(), String> {
    let significant = decimal.mantissa().unsigned_abs().to_string().len() as u32;
    let decimals = decimal.scale();
    let digits = significant.max(decimals);
    let whole_digits = digits - decimals;

    if digits > max_digits {
        return Err(format!(
            "Ensure that there are no more than {max_digits} digits in total."
        ));
    }
    if decimals > decimal_places {
        return Err(format!(
            "Ensure that there are no more than {decimal_places} decimal places."
        ));
    }
    if whole_digits > max_digits - decimal_places {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            max_digits - decimal_places
        ));
    }

    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') || domain.is_empty() {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

/// Lowercases the domain part of an email, keeping the local part as given.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Parses a comma separated id list such as `1,2,3`.
pub fn parse_ids(key: &str, raw: &str) -> Result<Vec<Id>, Error> {
    raw.split(',')
        .map(|part| part.trim().parse::<Id>())
        .collect::<Result<Vec<Id>, _>>()
        .map_err(|_| ValidationErrors::single(key, "A valid integer is required.").into())
}

/// Parses a `0`/`1` flag from a query string.
pub fn parse_flag(key: &str, raw: &str) -> Result<bool, Error> {
    match raw.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(ValidationErrors::single(key, "Must be 0 or 1.").into()),
    }
}

pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;
pub const NAME_MAX_LENGTH: usize = 255;
pub const PASSWORD_MIN_LENGTH: usize = 5;

/// Recipe fields from a create, full update or partial update request.
/// `tags`/`ingredients` are `Some` only when the request carried them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeChanges {
    pub fn from_form(form: &Form, partial: bool) -> Result<Self, Error> {
        let mut reader = form.reader(partial);

        let changes = Self {
            title: reader.text("title", Text::required().max_length(NAME_MAX_LENGTH)),
            description: reader.text("description", Text::optional()),
            time_minutes: reader.integer("time_minutes", true),
            price: reader.decimal("price", true, PRICE_MAX_DIGITS, PRICE_DECIMAL_PLACES),
            link: reader.text("link", Text::optional().max_length(NAME_MAX_LENGTH)),
            tags: reader.named_list("tags"),
            ingredients: reader.named_list("ingredients"),
        };
        reader.finish()?;

        Ok(changes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

impl TryFrom<RecipeChanges> for NewRecipe {
    type Error = Error;

    fn try_from(value: RecipeChanges) -> Result<Self, Self::Error> {
        let mut errors = ValidationErrors::new();
        if value.title.is_none() {
            errors.add("title", REQUIRED);
        }
        if value.time_minutes.is_none() {
            errors.add("time_minutes", REQUIRED);
        }
        if value.price.is_none() {
            errors.add("price", REQUIRED);
        }

        match (value.title, value.time_minutes, value.price) {
            (Some(title), Some(time_minutes), Some(price)) => Ok(Self {
                title,
                description: value.description.unwrap_or_default(),
                time_minutes,
                price,
                link: value.link.unwrap_or_default(),
                tags: value.tags.unwrap_or_default(),
                ingredients: value.ingredients.unwrap_or_default(),
            }),
            _ => Err(errors.into()),
        }
    }
}

/// Name of a tag or ingredient from a create or update request.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChanges {
    pub name: Option<String>,
}

impl AttributeChanges {
    pub fn from_form(form: &Form, partial: bool) -> Result<Self, Error> {
        let mut reader = form.reader(partial);
        let name = reader.text("name", Text::required().max_length(NAME_MAX_LENGTH));
        reader.finish()?;

        Ok(Self { name })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl UserChanges {
    pub fn from_form(form: &Form, partial: bool) -> Result<Self, Error> {
        let mut reader = form.reader(partial);

        let changes = Self {
            email: reader.email("email", true).map(|email| normalize_email(&email)),
            password: reader.text(
                "password",
                Text::required().min_length(PASSWORD_MIN_LENGTH).max_length(128),
            ),
            name: reader.text("name", Text::required().max_length(NAME_MAX_LENGTH)),
        };
        reader.finish()?;

        Ok(changes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn from_form(form: &Form) -> Result<Self, Error> {
        let mut reader = form.reader(false);
        let email = reader.text("email", Text::required());
        let password = reader.text("password", Text::required().untrimmed());
        reader.finish()?;

        match (email, password) {
            (Some(email), Some(password)) => Ok(Self { email, password }),
            _ => Err(HtmlError::InvalidRequest.default()),
        }
    }
}

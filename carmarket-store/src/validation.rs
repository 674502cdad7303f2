//! Form validation for sign-in, registration and car listings.

use std::borrow::Cow;
use std::collections::BTreeSet;

use chrono::{Datelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use carmarket_shared::types::auth::UserRole;
use carmarket_shared::{AppError, AppResult, ErrorCode, FieldError};

use crate::models::{Car, Condition, FuelType, SellerType, Transmission};

pub const MIN_CAR_YEAR: i32 = 1990;
pub const MAX_PRICE: u64 = 50_000_000_000;
pub const MAX_MILEAGE: u32 = 1_000_000;

lazy_static! {
    static ref PASSWORD_CHARS_RE: Regex = Regex::new(r"^[A-Za-z0-9@$!%*?&]{8,}$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^(\+84|0)[3-9]\d{8}$").unwrap();
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(custom = "required", email(message = "invalid email address"))]
    pub email: String,
    #[validate(custom = "required")]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(custom = "name_length")]
    pub name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(custom = "password_strength")]
    pub password: String,
    #[validate(must_match(other = "password", message = "passwords do not match"))]
    pub confirm_password: String,
    #[validate(custom = "vietnamese_phone")]
    pub phone: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CarForm {
    #[validate(custom = "title_length")]
    pub title: String,
    #[validate(custom = "required")]
    pub brand: String,
    #[validate(custom = "required")]
    pub model: String,
    #[validate(custom = "model_year")]
    pub year: i32,
    #[validate(range(min = 1, max = 50000000000, message = "price must be between 1 and 50 billion VND"))]
    pub price: u64,
    #[validate(range(max = 1000000, message = "mileage must be at most 1,000,000 km"))]
    pub mileage: u32,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    #[serde(default)]
    pub color: String,
    #[validate(custom = "description_length")]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[validate(custom = "required")]
    pub location: String,
    #[serde(default)]
    pub features: BTreeSet<String>,
    pub condition: Condition,
    pub seller_type: Option<SellerType>,
}

impl From<&Car> for CarForm {
    fn from(car: &Car) -> Self {
        Self {
            title: car.title.clone(),
            brand: car.brand.clone(),
            model: car.model.clone(),
            year: car.year,
            price: car.price,
            mileage: car.mileage,
            fuel_type: car.fuel_type,
            transmission: car.transmission,
            color: car.color.clone(),
            description: car.description.clone(),
            images: car.images.clone(),
            location: car.location.clone(),
            features: car.features.clone(),
            condition: car.condition,
            seller_type: car.seller_type,
        }
    }
}

fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn trimmed_len_between(value: &str, min: usize, max: usize, label: &str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(invalid("required", format!("{label} is required")));
    }
    if len < min || len > max {
        return Err(invalid(
            "length",
            format!("{label} must be between {min} and {max} characters"),
        ));
    }
    Ok(())
}

fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "this field is required"));
    }
    Ok(())
}

pub(crate) fn name_length(value: &str) -> Result<(), ValidationError> {
    trimmed_len_between(value, 2, 50, "name")
}

fn title_length(value: &str) -> Result<(), ValidationError> {
    trimmed_len_between(value, 10, 100, "title")
}

fn description_length(value: &str) -> Result<(), ValidationError> {
    trimmed_len_between(value, 50, 1000, "description")
}

/// At least 8 characters from the allowed set with a lower-case letter, an
/// upper-case letter and a digit.
fn password_strength(value: &str) -> Result<(), ValidationError> {
    let ok = PASSWORD_CHARS_RE.is_match(value)
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit());
    if !ok {
        return Err(invalid(
            "password",
            "password must be at least 8 characters with one upper-case letter, one lower-case letter and one digit",
        ));
    }
    Ok(())
}

pub(crate) fn vietnamese_phone(value: &str) -> Result<(), ValidationError> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if !PHONE_RE.is_match(&compact) {
        return Err(invalid("phone", "invalid phone number"));
    }
    Ok(())
}

fn model_year(value: i32) -> Result<(), ValidationError> {
    let max = Utc::now().year() + 1;
    if value < MIN_CAR_YEAR || value > max {
        return Err(invalid("year", format!("year must be between {MIN_CAR_YEAR} and {max}")));
    }
    Ok(())
}

/// Flatten validator output into `{field, message}` pairs, sorted by field.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid {field}"));
                FieldError::new(field, message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// Validate a form, mapping failures to `E0002` with the field list in `details`.
pub fn validate_form<T: Validate>(form: &T) -> AppResult<()> {
    form.validate().map_err(|e| {
        let fields = field_errors(&e);
        AppError::with_details(
            ErrorCode::ValidationError,
            "validation failed",
            serde_json::to_value(&fields).unwrap_or_default(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str, confirm: &str, phone: Option<&str>) -> RegisterForm {
        RegisterForm {
            name: "Nguyen Van A".into(),
            email: "a@example.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
            phone: phone.map(str::to_string),
            role: None,
        }
    }

    fn car_form() -> CarForm {
        CarForm {
            title: "Toyota Camry 2.5Q 2022".into(),
            brand: "Toyota".into(),
            model: "Camry".into(),
            year: 2022,
            price: 1_150_000_000,
            mileage: 25_000,
            fuel_type: FuelType::Gasoline,
            transmission: Transmission::Automatic,
            color: "white".into(),
            description: "One owner, full service history at the dealer, no accidents, new tyres.".into(),
            images: vec![],
            location: "Hà Nội".into(),
            features: BTreeSet::new(),
            condition: Condition::Used,
            seller_type: None,
        }
    }

    fn fields(result: AppResult<()>) -> Vec<String> {
        match result {
            Ok(()) => vec![],
            Err(AppError::Known { details: Some(details), .. }) => {
                let list: Vec<FieldError> = serde_json::from_value(details).unwrap();
                list.into_iter().map(|f| f.field).collect()
            }
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn valid_register_form_passes() {
        assert!(validate_form(&register("Secret123", "Secret123", Some("090 123 4567"))).is_ok());
        assert!(validate_form(&register("Secret123", "Secret123", Some("+84912345678"))).is_ok());
    }

    #[test]
    fn weak_password_is_rejected() {
        for weak in ["short1A", "alllower123", "ALLUPPER123", "NoDigitsHere", "Spaced 123A"] {
            assert_eq!(fields(validate_form(&register(weak, weak, None))), vec!["password"], "{weak}");
        }
    }

    #[test]
    fn mismatched_confirmation_is_reported() {
        let errs = fields(validate_form(&register("Secret123", "Secret124", None)));
        assert_eq!(errs, vec!["confirm_password"]);
    }

    #[test]
    fn phone_must_be_vietnamese_mobile() {
        let errs = fields(validate_form(&register("Secret123", "Secret123", Some("0212345678"))));
        assert_eq!(errs, vec!["phone"]);
    }

    #[test]
    fn short_name_is_rejected_after_trim() {
        let mut form = register("Secret123", "Secret123", None);
        form.name = "  A  ".into();
        assert_eq!(fields(validate_form(&form)), vec!["name"]);
    }

    #[test]
    fn login_requires_both_fields() {
        let form = LoginForm { email: "".into(), password: " ".into() };
        let errs = fields(validate_form(&form));
        assert!(errs.contains(&"email".to_string()));
        assert!(errs.contains(&"password".to_string()));
    }

    #[test]
    fn valid_car_form_passes() {
        assert!(validate_form(&car_form()).is_ok());
    }

    #[test]
    fn car_bounds_are_enforced() {
        let mut form = car_form();
        form.year = 1989;
        form.price = 0;
        form.mileage = MAX_MILEAGE + 1;
        form.title = "Short".into();
        form.description = "Too short".into();
        form.location = "   ".into();

        let errs = fields(validate_form(&form));
        assert_eq!(
            errs,
            vec!["description", "location", "mileage", "price", "title", "year"]
        );
    }

    #[test]
    fn next_model_year_is_allowed() {
        let mut form = car_form();
        form.year = Utc::now().year() + 1;
        assert!(validate_form(&form).is_ok());
        form.year += 1;
        assert_eq!(fields(validate_form(&form)), vec!["year"]);
    }
}

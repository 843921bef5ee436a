use serde::Deserialize;

use crate::errors::{AppError, FieldErrors};
use crate::models::customer::DEFAULT_IMAGE_URL;
use crate::validation::{
    is_plausible_email, non_blank, normalize_email, push_error, too_long, too_long_message,
};

/// Raw customer form body.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerInput {
    pub name: String,
    pub email: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Copy)]
pub enum CustomerAction {
    Create,
    Update,
}

impl CustomerAction {
    fn failure_message(self) -> &'static str {
        match self {
            CustomerAction::Create => "Missing Fields. Failed to Create Customer.",
            CustomerAction::Update => "Missing Fields. Failed to Update Customer.",
        }
    }
}

impl CustomerForm {
    pub fn validate(self, action: CustomerAction) -> Result<CustomerInput, AppError> {
        let mut errors = FieldErrors::new();

        let name = non_blank(self.name.as_deref()).map(str::to_string);
        match &name {
            None => push_error(&mut errors, "name", "Please enter a customer name."),
            Some(n) if too_long(n) => push_error(&mut errors, "name", too_long_message("Name")),
            Some(_) => {}
        }

        let email = non_blank(self.email.as_deref()).map(normalize_email);
        match &email {
            Some(e) if too_long(e) => push_error(&mut errors, "email", too_long_message("Email")),
            Some(e) if is_plausible_email(e) => {}
            _ => push_error(&mut errors, "email", "Please enter a valid email address."),
        }

        let image_url = non_blank(self.image_url.as_deref())
            .unwrap_or(DEFAULT_IMAGE_URL)
            .to_string();
        if !(image_url.starts_with('/')
            || image_url.starts_with("http://")
            || image_url.starts_with("https://"))
        {
            push_error(
                &mut errors,
                "image_url",
                "Image URL must be an absolute path or http(s) URL.",
            );
        } else if too_long(&image_url) {
            push_error(&mut errors, "image_url", too_long_message("Image URL"));
        }

        match (name, email) {
            (Some(name), Some(email)) if errors.is_empty() => Ok(CustomerInput {
                name,
                email,
                image_url,
            }),
            _ => Err(AppError::validation(action.failure_message(), errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: Option<&str>, email: Option<&str>, image_url: Option<&str>) -> CustomerForm {
        CustomerForm {
            name: name.map(String::from),
            email: email.map(String::from),
            image_url: image_url.map(String::from),
        }
    }

    #[test]
    fn test_valid_form_defaults_image() {
        let input = form(Some(" Lee Robinson "), Some("Lee@Robinson.com"), None)
            .validate(CustomerAction::Create)
            .unwrap();
        assert_eq!(input.name, "Lee Robinson");
        assert_eq!(input.email, "lee@robinson.com");
        assert_eq!(input.image_url, DEFAULT_IMAGE_URL);
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let err = form(None, Some("nope"), Some("ftp://x"))
            .validate(CustomerAction::Update)
            .unwrap_err();
        let AppError::Validation { message, fields } = err else {
            panic!("expected validation error");
        };
        assert_eq!(message, "Missing Fields. Failed to Update Customer.");
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_values_longer_than_columns_are_rejected() {
        let long_name = "x".repeat(300);
        let long_email = format!("{}@example.com", "a".repeat(250));
        let long_url = format!("/customers/{}.png", "b".repeat(250));
        let err = form(Some(&long_name), Some(&long_email), Some(&long_url))
            .validate(CustomerAction::Create)
            .unwrap_err();
        let AppError::Validation { fields, .. } = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields["name"], vec!["Name must be at most 255 characters."]);
        assert_eq!(fields["email"], vec!["Email must be at most 255 characters."]);
        assert_eq!(
            fields["image_url"],
            vec!["Image URL must be at most 255 characters."]
        );
    }
}

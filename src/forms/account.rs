//! Registration, profile and login forms.

use rusqlite::Connection;
use serde::Deserialize;
use validator::ValidateEmail;

use crate::db::models::ProfileUpdate;
use crate::db::users;
use crate::forms::{max_chars, required, FormErrors};

pub const USERNAME_MAX_CHARS: usize = 150;
pub const NAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

/// Path segments under `/profile/` that cannot be usernames.
const RESERVED_USERNAMES: &[&str] = &["edit"];

pub const BAD_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

fn username_chars_ok(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '@' | '.' | '+' | '-'))
}

/// Shared username checks; `self_id` is the account being edited, if any.
fn clean_username(
    errors: &mut FormErrors,
    conn: &Connection,
    raw: &str,
    self_id: Option<i64>,
) -> rusqlite::Result<Option<String>> {
    let Some(username) = required(errors, "username", raw) else {
        return Ok(None);
    };
    if !max_chars(errors, "username", &username, USERNAME_MAX_CHARS) {
        return Ok(None);
    }
    if !username_chars_ok(&username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
        return Ok(None);
    }
    if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
        errors.add("username", "This username is reserved.");
        return Ok(None);
    }
    if users::username_taken(conn, &username, self_id)? {
        errors.add("username", "A user with that username already exists.");
        return Ok(None);
    }
    Ok(Some(username))
}

fn clean_name(errors: &mut FormErrors, field: &str, raw: &str) -> String {
    let value = raw.trim().to_string();
    max_chars(errors, field, &value, NAME_MAX_CHARS);
    value
}

fn clean_email(errors: &mut FormErrors, raw: &str) -> String {
    let value = raw.trim().to_string();
    if !value.is_empty() && !value.validate_email() {
        errors.add("email", "Enter a valid email address.");
    }
    value
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
    #[serde(skip)]
    pub errors: FormErrors,
}

/// Registration that passed validation; the password is still plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanRegistration {
    pub profile: ProfileUpdate,
    pub password: String,
}

impl RegistrationForm {
    pub fn validate(&mut self, conn: &Connection) -> rusqlite::Result<Option<CleanRegistration>> {
        let mut errors = FormErrors::default();

        let first_name = clean_name(&mut errors, "first_name", &self.first_name);
        let last_name = clean_name(&mut errors, "last_name", &self.last_name);
        let email = clean_email(&mut errors, &self.email);
        let username = clean_username(&mut errors, conn, &self.username, None)?;

        // Passwords are not trimmed.
        if self.password1.is_empty() {
            errors.add("password1", super::REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", super::REQUIRED);
        }
        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", "The two password fields didn't match.");
            } else {
                if self.password1.chars().count() < PASSWORD_MIN_CHARS {
                    errors.add(
                        "password2",
                        format!(
                            "This password is too short. It must contain at least {} characters.",
                            PASSWORD_MIN_CHARS
                        ),
                    );
                }
                if self.password1.chars().all(|c| c.is_ascii_digit()) {
                    errors.add("password2", "This password is entirely numeric.");
                }
            }
        }

        // Never echo passwords back into the re-rendered form.
        let password = std::mem::take(&mut self.password1);
        self.password2.clear();

        if !errors.is_empty() {
            self.errors = errors;
            return Ok(None);
        }

        Ok(username.map(|username| CleanRegistration {
            profile: ProfileUpdate {
                username,
                first_name,
                last_name,
                email,
            },
            password,
        }))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub errors: FormErrors,
}

impl ProfileForm {
    pub fn from_user(user: &crate::db::models::User) -> Self {
        ProfileForm {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            errors: FormErrors::default(),
        }
    }

    pub fn validate(
        &mut self,
        conn: &Connection,
        user_id: i64,
    ) -> rusqlite::Result<Option<ProfileUpdate>> {
        let mut errors = FormErrors::default();

        let first_name = clean_name(&mut errors, "first_name", &self.first_name);
        let last_name = clean_name(&mut errors, "last_name", &self.last_name);
        let email = clean_email(&mut errors, &self.email);
        let username = clean_username(&mut errors, conn, &self.username, Some(user_id))?;

        if !errors.is_empty() {
            self.errors = errors;
            return Ok(None);
        }

        Ok(username.map(|username| ProfileUpdate {
            username,
            first_name,
            last_name,
            email,
        }))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
    #[serde(skip)]
    pub errors: FormErrors,
}

impl LoginForm {
    /// Only same-site absolute paths are followed after login.
    pub fn safe_next(&self) -> &str {
        let next = self.next.trim();
        if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
            next
        } else {
            "/"
        }
    }

    pub fn reject(&mut self) {
        self.password.clear();
        self.errors = FormErrors::default();
        self.errors.add("__all__", BAD_LOGIN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewUser;
    use crate::db::test_pool;

    fn registration(username: &str, p1: &str, p2: &str) -> RegistrationForm {
        RegistrationForm {
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            username: username.into(),
            email: "ann@example.com".into(),
            password1: p1.into(),
            password2: p2.into(),
            errors: FormErrors::default(),
        }
    }

    fn existing(conn: &Connection, username: &str) -> i64 {
        users::insert(
            conn,
            &NewUser {
                username: username.into(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash: "x".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn valid_registration() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let mut form = registration("ann", "s3cret-pass", "s3cret-pass");
        let clean = form.validate(&conn).unwrap().unwrap();
        assert_eq!(clean.profile.username, "ann");
        assert_eq!(clean.password, "s3cret-pass");
        assert!(form.password1.is_empty());
    }

    #[test]
    fn password_mismatch() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let mut form = registration("ann", "s3cret-pass", "s3cret-pasz");
        assert!(form.validate(&conn).unwrap().is_none());
        assert_eq!(
            form.errors.for_field("password2"),
            ["The two password fields didn't match."]
        );
    }

    #[test]
    fn weak_passwords() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let mut form = registration("ann", "short", "short");
        assert!(form.validate(&conn).unwrap().is_none());
        assert!(form.errors.has("password2"));

        let mut form = registration("ann", "1234567890", "1234567890");
        assert!(form.validate(&conn).unwrap().is_none());
        assert_eq!(
            form.errors.for_field("password2"),
            ["This password is entirely numeric."]
        );
    }

    #[test]
    fn username_rules() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        existing(&conn, "taken");

        let long = "x".repeat(151);
        for bad in ["", "has space", "edit", "taken", long.as_str()] {
            let mut form = registration(bad, "s3cret-pass", "s3cret-pass");
            assert!(form.validate(&conn).unwrap().is_none(), "{:?} accepted", bad);
            assert!(form.errors.has("username"));
        }

        let mut form = registration("jürgen.b+1@x", "s3cret-pass", "s3cret-pass");
        assert!(form.validate(&conn).unwrap().is_some());
    }

    #[test]
    fn email_rules() {
        for good in ["a@b.co", "  ann.lee+blog@example.com ", ""] {
            let mut errors = FormErrors::default();
            clean_email(&mut errors, good);
            assert!(!errors.has("email"), "{:?} rejected", good);
        }
        for bad in ["a@", "@b.co", "a b@c.de", "a@@c.de", "plain"] {
            let mut errors = FormErrors::default();
            clean_email(&mut errors, bad);
            assert_eq!(
                errors.for_field("email"),
                ["Enter a valid email address."],
                "{:?} accepted",
                bad
            );
        }
    }

    #[test]
    fn profile_may_keep_own_username() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let me = existing(&conn, "me");
        existing(&conn, "other");

        let mut form = ProfileForm {
            username: "me".into(),
            email: "bad".into(),
            ..ProfileForm::default()
        };
        assert!(form.validate(&conn, me).unwrap().is_none());
        assert!(form.errors.has("email"));
        assert!(!form.errors.has("username"));

        let mut form = ProfileForm {
            username: "other".into(),
            ..ProfileForm::default()
        };
        assert!(form.validate(&conn, me).unwrap().is_none());
        assert!(form.errors.has("username"));

        let mut form = ProfileForm {
            username: "me".into(),
            first_name: "Me".into(),
            ..ProfileForm::default()
        };
        let update = form.validate(&conn, me).unwrap().unwrap();
        assert_eq!(update.first_name, "Me");
    }

    #[test]
    fn login_next_must_be_local() {
        let mut form = LoginForm::default();
        assert_eq!(form.safe_next(), "/");
        form.next = "/posts/create".into();
        assert_eq!(form.safe_next(), "/posts/create");
        form.next = "//evil.example".into();
        assert_eq!(form.safe_next(), "/");
        form.next = "https://evil.example".into();
        assert_eq!(form.safe_next(), "/");
    }
}

//! Sign-in and registration forms.

use tracing::{info, warn};

use crate::api::SchoolApi;
use crate::dialogs::Form;
use crate::error::AppError;
use crate::models::{LoginRequest, RegisterRequest, Role, User};
use crate::session::SessionStore;
use crate::views::{Banner, Severity};

const SIGN_IN_FAILED: &str = "Invalid email or password";
const REGISTER_FAILED: &str = "Failed to register user";
pub const REGISTERED: &str = "User registered successfully. Please log in.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl Form for SignInForm {
    fn set_field(&mut self, name: &str, value: &str) -> bool {
        let field = match name {
            "email" => &mut self.email,
            "password" => &mut self.password,
            _ => return false,
        };
        *field = value.to_string();
        true
    }

    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![("Email", self.email.as_str()), ("Password", self.password.as_str())]
    }
}

impl SignInForm {
    /// Logs in and activates the session. Server rejections all read as bad
    /// credentials; network failures keep their own message.
    pub async fn submit(&self, api: &dyn SchoolApi, session: &SessionStore) -> Result<User, AppError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::validation("Email and password are required"));
        }
        let req = LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        let res = match api.login(&req).await {
            Ok(res) => res,
            Err(e @ AppError::Transport(_)) => return Err(e),
            Err(e) => {
                warn!("Sign in failed: {}", e);
                return Err(AppError::validation(SIGN_IN_FAILED));
            }
        };
        let user = res.user.clone();
        session.sign_in(res.token, res.user).await?;
        Ok(user)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
    pub confirm_password: String,
}

impl Default for SignUpForm {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            role: Role::Teacher,
            password: String::new(),
            confirm_password: String::new(),
        }
    }
}

impl Form for SignUpForm {
    fn set_field(&mut self, name: &str, value: &str) -> bool {
        if name == "role" {
            return match value.parse() {
                Ok(role) => {
                    self.role = role;
                    true
                }
                Err(_) => false,
            };
        }
        let field = match name {
            "fullName" | "full_name" => &mut self.full_name,
            "email" => &mut self.email,
            "password" => &mut self.password,
            "confirmPassword" | "confirm_password" => &mut self.confirm_password,
            _ => return false,
        };
        *field = value.to_string();
        true
    }

    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Full name", self.full_name.as_str()),
            ("Email", self.email.as_str()),
            ("Password", self.password.as_str()),
        ]
    }
}

impl SignUpForm {
    /// Registers the account. Does not sign in.
    pub async fn submit(&self, api: &dyn SchoolApi) -> Result<(), AppError> {
        if let Some((label, _)) = self
            .required_fields()
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            return Err(AppError::validation(format!("{} is required", label)));
        }
        if self.password != self.confirm_password {
            return Err(AppError::validation("Passwords do not match. Please try again."));
        }
        let req = RegisterRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            role: self.role,
            full_name: self.full_name.trim().to_string(),
        };
        match api.register(&req).await {
            Ok(()) => {
                info!("Registered {} as {}", req.email, req.role);
                Ok(())
            }
            Err(e @ AppError::Transport(_)) => Err(e),
            Err(e) => {
                warn!("Sign up failed: {}", e);
                Err(AppError::validation(e.banner_text(REGISTER_FAILED)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

/// The sign-in page: one of the two forms plus its message line.
#[derive(Debug, Clone)]
pub struct AuthPanel {
    mode: AuthMode,
    pub sign_in: SignInForm,
    pub sign_up: SignUpForm,
    banner: Option<Banner>,
}

impl Default for AuthPanel {
    fn default() -> Self {
        Self {
            mode: AuthMode::SignIn,
            sign_in: SignInForm::default(),
            sign_up: SignUpForm::default(),
            banner: None,
        }
    }
}

impl AuthPanel {
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn switch_to(&mut self, mode: AuthMode) {
        self.mode = mode;
        self.banner = None;
    }

    pub async fn sign_in(&mut self, api: &dyn SchoolApi, session: &SessionStore) -> Result<User, AppError> {
        let result = self.sign_in.submit(api, session).await;
        match &result {
            Ok(_) => self.banner = None,
            Err(e) => self.show_error(e, SIGN_IN_FAILED),
        }
        result
    }

    /// On success the panel goes back to sign-in with the email filled in.
    pub async fn sign_up(&mut self, api: &dyn SchoolApi) -> Result<(), AppError> {
        let result = self.sign_up.submit(api).await;
        match &result {
            Ok(()) => {
                self.sign_in = SignInForm {
                    email: self.sign_up.email.trim().to_string(),
                    password: String::new(),
                };
                self.sign_up = SignUpForm::default();
                self.mode = AuthMode::SignIn;
                self.banner = Some(Banner {
                    severity: Severity::Success,
                    text: REGISTERED.to_string(),
                });
            }
            Err(e) => self.show_error(e, REGISTER_FAILED),
        }
        result
    }

    fn show_error(&mut self, err: &AppError, fallback: &str) {
        self.banner = Some(Banner {
            severity: Severity::Error,
            text: err.banner_text(fallback),
        });
    }
}

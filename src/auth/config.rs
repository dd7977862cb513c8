use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::browser::Selector;

/// Login endpoints, session persistence and the selector vocabulary used to
/// drive the login form.
///
/// Selector lists are tried in order, so put the most specific first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Site root (default: https://trailhead.salesforce.com)
    pub base_url: String,

    /// Page that only renders fully for signed-in users (default: /home)
    pub home_path: String,

    /// Login form location (default: /sessions/users/new?type=tbidlogin)
    pub login_path: String,

    /// Saved browser storage state (default: trailhead_session.json)
    pub session_file: PathBuf,

    /// URL fragments that mean the browser sits on a login page
    pub login_url_markers: Vec<String>,

    /// How long to wait for the loading overlay before clicking (default: 10)
    pub loading_wait_secs: u64,

    /// Present only when signed in
    pub logged_in: Vec<Selector>,

    /// Present only when signed out
    pub logged_out: Vec<Selector>,

    pub email_input: Vec<Selector>,
    pub submit: Vec<Selector>,
    pub captcha: Vec<Selector>,
    pub code_input: Vec<Selector>,
    pub verify: Vec<Selector>,

    /// Overlay that swallows clicks while the login form is busy
    pub loading_indicator: Selector,

    /// Everything that could be a submit control, listed when none is found
    pub button_candidates: Selector,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            base_url: "https://trailhead.salesforce.com".to_string(),
            home_path: "/home".to_string(),
            login_path: "/sessions/users/new?type=tbidlogin".to_string(),
            session_file: PathBuf::from("trailhead_session.json"),
            login_url_markers: vec!["login".to_string(), "sessions".to_string()],
            loading_wait_secs: 10,
            logged_in: Selector::parse_all(&[
                "[data-testid='user-menu']",
                ".user-menu",
                ".profile-menu",
                "[data-testid='profile']",
                ".profile",
                ".user-profile",
                "[data-testid='avatar']",
                ".avatar",
                ".user-avatar",
                "img[alt*='profile']",
                "img[alt*='avatar']",
                ".user-info",
                ".user-details",
                "[data-testid='user-info']",
                ".trailhead-user",
                ".user-dropdown",
                ".account-menu",
            ]),
            logged_out: Selector::parse_all(&[
                "[data-testid='login-button']",
                ".login-button",
                "a[href*='login']",
                "button:has-text('Log In')",
                "button:has-text('Sign In')",
                "a:has-text('Log In')",
                "a:has-text('Sign In')",
                ".login-link",
                ".signin-button",
                "[data-testid='signin']",
            ]),
            email_input: Selector::parse_all(&[
                "#field",
                "input[type='email']",
                "input[name='email']",
                "input[name='username']",
                "#username",
                "#email",
            ]),
            submit: Selector::parse_all(&[
                "button[type='submit'][part='button']",
                "button[type='submit']",
                "input[type='submit']",
                "button:has-text('Log In')",
                "button:has-text('Sign In')",
                ".login-submit",
            ]),
            captcha: Selector::parse_all(&[
                ".g-recaptcha",
                "#recaptcha",
                "iframe[src*='recaptcha']",
                "[data-testid='recaptcha']",
            ]),
            code_input: Selector::parse_all(&[
                "#field",
                "input[name='otp']",
                "input[type='text']",
                "input[type='number']",
                "input[type='tel']",
                "input[name='code']",
                "input[name='verification']",
                "input[placeholder*='code']",
                "input[placeholder*='verification']",
                "input[placeholder*='OTP']",
                "#code",
                "#verification",
                "#otp",
                "[data-testid*='code']",
                "[data-testid*='verification']",
            ]),
            verify: Selector::parse_all(&[
                "lwc-wes-button",
                "lwc-wes-button:has-text('Submit code')",
                "button[type='submit'][part='button']",
                "button[type='submit']",
                "button:has-text('Verify')",
                "button:has-text('Submit')",
                "button:has-text('Submit code')",
                "button:has-text('Continue')",
                ".verify-button",
            ]),
            loading_indicator: Selector::parse("lwc-idx-loading"),
            button_candidates: Selector::parse("button, input[type='submit'], lwc-wes-button"),
        }
    }
}

impl AuthSettings {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn root_url(&self) -> String {
        self.url("/")
    }

    pub fn home_url(&self) -> String {
        self.url(&self.home_path)
    }

    pub fn login_url(&self) -> String {
        self.url(&self.login_path)
    }

    pub fn loading_wait(&self) -> Duration {
        Duration::from_secs(self.loading_wait_secs)
    }

    /// Host part of `base_url`, used by the URL fallback of the login probe.
    pub fn site_host(&self) -> Option<String> {
        url::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let settings = AuthSettings::default();
        assert_eq!(settings.root_url(), "https://trailhead.salesforce.com/");
        assert_eq!(settings.home_url(), "https://trailhead.salesforce.com/home");
        assert_eq!(
            settings.login_url(),
            "https://trailhead.salesforce.com/sessions/users/new?type=tbidlogin"
        );
        assert_eq!(settings.site_host().as_deref(), Some("trailhead.salesforce.com"));
    }

    #[test]
    fn test_selector_lists_are_editable_in_toml() {
        let settings: AuthSettings = toml::from_str(
            r#"
            base_url = "http://localhost:8080/"
            logged_in = [".me", "a:has-text('Sign out')"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.home_url(), "http://localhost:8080/home");
        assert_eq!(settings.logged_in.len(), 2);
        assert_eq!(settings.logged_in[1].has_text(), Some("Sign out"));
        // untouched lists keep their defaults
        assert_eq!(settings.email_input[0].css(), "#field");
    }
}

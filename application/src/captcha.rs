//! [`Captcha`] verification of logins.

use derive_more::{Display, Error as StdError, From};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use tracerr::Traced;
use tracing as log;
use url::Url;

use crate::{config, define_error, AsError};

/// Client of a [reCAPTCHA]-compatible human verification provider.
///
/// [reCAPTCHA]: https://developers.google.com/recaptcha/docs/verify
#[derive(Debug)]
pub struct Captcha {
    /// [`Mode`] of this [`Captcha`].
    mode: Mode,

    /// URL of the provider's verification endpoint.
    verify_url: Url,

    /// Minimal score a verification must have to be accepted.
    min_score: f64,

    /// HTTP client to perform requests with.
    client: reqwest::Client,
}

/// Verification mode of a [`Captcha`].
#[derive(Debug)]
enum Mode {
    /// Every verification is sent to the provider.
    Enforce {
        /// Secret key of the provider.
        secret: SecretString,
    },

    /// Every verification passes without contacting the provider.
    Bypass,
}

/// Verdict of the verification provider.
#[derive(Debug, Deserialize)]
struct Verdict {
    /// Whether the provided token is valid.
    success: bool,

    /// Likelihood of the interaction being human, if scored at all.
    score: Option<f64>,
}

impl Captcha {
    /// Creates a new [`Captcha`] out of the provided [`config::Captcha`].
    ///
    /// # Errors
    ///
    /// If the [`config::CaptchaMode::Enforce`] is configured without a
    /// secret, or the HTTP client fails to initialize.
    pub fn new(conf: config::Captcha) -> Result<Self, Traced<Error>> {
        let config::Captcha {
            mode,
            secret,
            verify_url,
            min_score,
            timeout,
        } = conf;

        let mode = match mode {
            config::CaptchaMode::Enforce => Mode::Enforce {
                secret: secret
                    .filter(|s| !s.is_empty())
                    .map(SecretString::from)
                    .ok_or_else(|| tracerr::new!(Error::NoSecret))?,
            },
            config::CaptchaMode::Bypass => {
                log::warn!(
                    "human verification is bypassed, \
                     never use this mode in production",
                );
                Mode::Bypass
            }
        };

        Ok(Self {
            mode,
            verify_url,
            min_score,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(tracerr::from_and_wrap!(=> Error))?,
        })
    }

    /// Verifies the provided `response` token obtained by a client.
    ///
    /// # Errors
    ///
    /// If the token is absent or rejected by the provider, or the provider is
    /// unreachable.
    pub async fn verify(
        &self,
        response: Option<&str>,
    ) -> Result<(), Traced<Error>> {
        let secret = match &self.mode {
            Mode::Enforce { secret } => secret,
            Mode::Bypass => {
                log::warn!("human verification bypassed");
                return Ok(());
            }
        };
        let response = response
            .filter(|r| !r.is_empty())
            .ok_or_else(|| tracerr::new!(Error::Missing))?;

        let verdict = self
            .client
            .post(self.verify_url.clone())
            .form(&[
                ("secret", secret.expose_secret()),
                ("response", response),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(tracerr::from_and_wrap!(=> Error))?
            .json::<Verdict>()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        let passed = verdict.success
            && verdict.score.map_or(true, |s| s >= self.min_score);
        if !passed {
            log::debug!(
                success = verdict.success,
                score = ?verdict.score,
                "human verification rejected",
            );
            return Err(tracerr::new!(Error::Rejected));
        }
        Ok(())
    }
}

/// Error of [`Captcha`] verification.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Captcha`] is enforced without a secret.
    #[display("`server.captcha.secret` is required in `enforce` mode")]
    #[from(ignore)]
    NoSecret,

    /// Client provided no token.
    #[display("Human verification token is missing")]
    #[from(ignore)]
    Missing,

    /// Provider rejected the token, or scored it too low.
    #[display("Human verification is rejected")]
    #[from(ignore)]
    Rejected,

    /// Provider request failed.
    #[display("Human verification request failed: {_0}")]
    Request(reqwest::Error),
}

impl AsError for Error {
    fn try_as_error(&self) -> Option<crate::Error> {
        match self {
            Self::Missing => Some(CaptchaError::Required.into()),
            Self::Rejected => Some(CaptchaError::Rejected.into()),
            Self::NoSecret | Self::Request(_) => None,
        }
    }
}

define_error! {
    enum CaptchaError {
        #[code = "CAPTCHA_REQUIRED"]
        #[status = BAD_REQUEST]
        #[message = "Human verification is required"]
        Required,

        #[code = "CAPTCHA_REJECTED"]
        #[status = UNAUTHORIZED]
        #[message = "Human verification failed"]
        Rejected,
    }
}

#[cfg(test)]
mod spec {
    use axum::{routing::post, Form, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use url::Url;

    use super::{Captcha, Error};
    use crate::config;

    /// Spawns a fake verification provider scoring tokens as
    /// `score-<score>`, or rejecting them for any other value.
    async fn provider() -> Url {
        async fn verify(
            Form(form): Form<Vec<(String, String)>>,
        ) -> Json<Value> {
            let response = form
                .iter()
                .find(|(k, _)| k == "response")
                .map(|(_, v)| v.as_str())
                .unwrap_or_default();
            let secret_ok =
                form.iter().any(|(k, v)| k == "secret" && v == "s3cr3t");
            match response.strip_prefix("score-") {
                Some(score) if secret_ok => Json(json!({
                    "success": true,
                    "score": score.parse::<f64>().unwrap(),
                })),
                _ => Json(json!({"success": false})),
            }
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/verify", post(verify));
        drop(tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        }));
        format!("http://{addr}/verify").parse().unwrap()
    }

    fn enforced(verify_url: Url) -> Captcha {
        Captcha::new(config::Captcha {
            mode: config::CaptchaMode::Enforce,
            secret: Some("s3cr3t".into()),
            verify_url,
            ..config::Captcha::default()
        })
        .unwrap()
    }

    #[test]
    fn enforce_requires_secret() {
        let err = Captcha::new(config::Captcha::default()).unwrap_err();

        assert!(matches!(err.as_ref(), Error::NoSecret));
    }

    #[tokio::test]
    async fn bypass_accepts_anything() {
        let captcha = Captcha::new(config::Captcha {
            mode: config::CaptchaMode::Bypass,
            ..config::Captcha::default()
        })
        .unwrap();

        captcha.verify(None).await.unwrap();
        captcha.verify(Some("garbage")).await.unwrap();
    }

    #[tokio::test]
    async fn enforce_requires_token() {
        let captcha = enforced(provider().await);

        let err = captcha.verify(None).await.unwrap_err();
        assert!(matches!(err.as_ref(), Error::Missing));

        let err = captcha.verify(Some("")).await.unwrap_err();
        assert!(matches!(err.as_ref(), Error::Missing));
    }

    #[tokio::test]
    async fn enforce_checks_verdict_and_score() {
        let captcha = enforced(provider().await);

        captcha.verify(Some("score-0.9")).await.unwrap();
        captcha.verify(Some("score-0.5")).await.unwrap();

        let err = captcha.verify(Some("score-0.3")).await.unwrap_err();
        assert!(matches!(err.as_ref(), Error::Rejected));

        let err = captcha.verify(Some("forged")).await.unwrap_err();
        assert!(matches!(err.as_ref(), Error::Rejected));
    }
}

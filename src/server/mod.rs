//! Axum HTTP surface: Salesforce login, encrypted session cookie, and the
//! session-authenticated proxy routes.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use decision_debt_studio::server::{AppConfig, AppState, router};
//!
//! let config = AppConfig::from_env()?;
//! let app = router(AppState::new(config)?);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! # Routes
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/api/auth/login` | redirect to Salesforce with a PKCE challenge |
//! | GET | `/api/auth/callback/salesforce` | exchange the code, log the session in |
//! | GET | `/api/auth/logout` | expire the session cookie |
//! | GET | `/api/health` | configuration presence report |
//! | POST | `/api/alert` | post the decision-debt alert to the webhook |
//! | POST | `/api/salesforce/insights/create` | create a `Decision_Insight__c` |
//! | GET | `/api/salesforce/insights/list` | latest 100 insights |
//! | PATCH | `/api/salesforce/insights/updateView` | bump an insight's view count |
//! | POST | `/api/salesforce/view-events/create` | create a `Decision_View_Event__c` |
//! | POST | `/api/tableau/frontdoor` | single-access URL for dashboard embedding |
//! | GET | `/api/debug/session`, `/api/debug/sobjects` | only with `DEBUG_ROUTES` |

mod config;
mod cookies;
mod error;
mod extractor;
mod ops;
mod proxy;
mod routes;
mod state;

pub use config::{AppConfig, LogFormat, LoggingConfig, MIN_SESSION_PASSWORD_LEN, SalesforceSettings};
pub use error::ApiError;
pub use extractor::{LoggedIn, Session, SessionData};
pub use proxy::{CREATE_INSIGHT, CREATE_VIEW_EVENT, RecordRoute};
pub use routes::router;
pub use state::AppState;

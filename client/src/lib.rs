//! Typed client for the mess attendance service.
//!
//! ```no_run
//! # async fn run() -> Result<(), mess_client::ClientError> {
//! use chrono::NaiveDate;
//! use mess_client::{LeaveReason, LeaveRegistration, MessClient};
//!
//! let client = MessClient::new("http://localhost:8080/api")?;
//! let mut session = client.login("asha.r", "correct horse").await?;
//!
//! let march = client
//!     .attendance()
//!     .my_attendance(
//!         &mut session,
//!         NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
//!     )
//!     .await?;
//! println!("{} days", march.len());
//!
//! client
//!     .leave()
//!     .register(
//!         &mut session,
//!         &LeaveRegistration::new(
//!             NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
//!             NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
//!             LeaveReason::SickLeave,
//!         ),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod attendance;
mod client;
mod error;
mod leave;
mod session;
mod types;

pub use attendance::AttendanceApi;
pub use client::MessClient;
pub use error::ClientError;
pub use leave::LeaveApi;
pub use session::Session;
pub use types::{
    AttendanceRecord, AttendanceStatus, Leave, LeaveReason, LeaveRegistration, Meal,
};

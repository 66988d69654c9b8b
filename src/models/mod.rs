// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod event;
pub mod payment;
pub mod registration;
pub mod user;

pub use event::Event;
pub use payment::{Payment, PaymentRequest, RequestStatus};
pub use registration::{Registration, SlotCounts, SLOT_CAPACITY};
pub use user::{Role, User};

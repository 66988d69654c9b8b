// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod export;
pub mod password;
pub mod whatsapp;

pub use export::registrations_to_csv;
pub use whatsapp::payment_request_link;

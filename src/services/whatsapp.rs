// SPDX-License-Identifier: MIT

//! WhatsApp deep links for payment-request notifications.
//!
//! Payments are settled out of band: the user opens a prefilled chat with
//! the admin, pays, and the admin approves from the dashboard. The server
//! only builds the link; the client opens it.

/// Build a `wa.me` deep link notifying the admin of a new payment request.
pub fn payment_request_link(phone: &str, user_email: &str, event_title: &str, price: i64) -> String {
    let message = format!(
        "🔔 New Payment Request\n\nUser: {}\nEvent: {}\nPrice: ₦{}\n\nPlease approve from admin dashboard.",
        user_email, event_title, price
    );

    format!(
        "https://wa.me/{}?text={}",
        phone,
        urlencoding::encode(&message)
    )
}

//! Test data helpers
//!
//! Generated driver data, route requests and reply inspection.

use fake::faker::name::en::Name;
use fake::Fake;
use route_buddy::models::CreateRouteRequest;
use route_buddy::services::{Keyboard, Reply};

pub fn fake_driver_name() -> String {
    Name().fake()
}

pub fn fake_phone() -> String {
    format!("+7{}", (7_000_000_000u64..7_999_999_999u64).fake::<u64>())
}

pub fn route_request(name: &str) -> CreateRouteRequest {
    CreateRouteRequest {
        name: name.to_string(),
        origin: "Алматы".to_string(),
        destination: "Астана".to_string(),
        distance_km: 1200,
        price: 300_000.0,
        cargo_type: Some("Общие грузы".to_string()),
        assign_to: None,
    }
}

/// Whether any reply carries exactly this text
pub fn has_text(replies: &[Reply], text: &str) -> bool {
    replies.iter().any(|reply| reply.body() == Some(text))
}

/// Whether any reply text contains the fragment
pub fn mentions(replies: &[Reply], fragment: &str) -> bool {
    replies
        .iter()
        .filter_map(Reply::body)
        .any(|body| body.contains(fragment))
}

/// Callback data of every inline button in the replies
pub fn button_data(replies: &[Reply]) -> Vec<String> {
    replies
        .iter()
        .filter_map(|reply| match reply {
            Reply::Text { keyboard: Some(Keyboard::Inline(rows)), .. }
            | Reply::Edit { keyboard: Some(Keyboard::Inline(rows)), .. } => Some(rows),
            _ => None,
        })
        .flatten()
        .flatten()
        .map(|button| button.data.clone())
        .collect()
}

/// Whether a reply shows the main menu keyboard
pub fn shows_menu(replies: &[Reply]) -> bool {
    replies
        .iter()
        .any(|reply| matches!(reply, Reply::Text { keyboard: Some(Keyboard::Menu(_)), .. }))
}

// SPDX-License-Identifier: MIT

//! CSV export of event registrations.

use crate::models::Registration;

const CSV_HEADER: &str = "Slot,Team,UserID,Email,Position";

/// Render an event's registrations as CSV under the header
/// `Slot,Team,UserID,Email,Position`.
///
/// Team names may contain commas ("A,B Squad"); they are stripped rather
/// than quoted so the columns line up in any spreadsheet import. User ids
/// and emails cannot contain commas.
pub fn registrations_to_csv(registrations: &[Registration]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for reg in registrations {
        let team = reg.team_name.replace(',', "");
        let position = reg
            .position
            .map(|p| p.to_string())
            .unwrap_or_default();

        out.push_str(&format!(
            "{},{},{},{},{}\n",
            reg.slot, team, reg.user_id, reg.user_email, position
        ));
    }

    out
}

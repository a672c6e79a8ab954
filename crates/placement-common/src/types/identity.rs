//! Block identity codec
//!
//! A block is identified internally by a 128-bit integer and displayed as a
//! dashed hex string in groups of 8-4-4-4-12 digits. The fully-qualified
//! block name joins the owning dataset name and the display name with `#`.

use crate::error::{PlacementError, Result};

/// Number of hex digits in a display name once the dashes are removed.
pub const DISPLAY_HEX_DIGITS: usize = 32;

/// Separator between the dataset name and the block display name.
pub const FULL_NAME_DELIMITER: char = '#';

/// Hex digit group widths of the display name.
const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// Convert a dashed-hex display name into its integer identity.
///
/// Upper- and lowercase digits are accepted.
///
/// # Examples
///
/// ```
/// use placement_common::types::identity::encode;
///
/// let id = encode("00000000-0000-0000-0000-0000000000ff").unwrap();
/// assert_eq!(id, 255);
/// ```
pub fn encode(display_name: &str) -> Result<u128> {
    let digits: String = display_name.chars().filter(|c| *c != '-').collect();

    if digits.is_empty() || digits.len() > DISPLAY_HEX_DIGITS {
        return Err(PlacementError::format(format!(
            "Invalid block name {}",
            display_name
        )));
    }

    // from_str_radix tolerates a leading '+', hex names never carry one
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PlacementError::format(format!(
            "Invalid block name {}",
            display_name
        )));
    }

    u128::from_str_radix(&digits, 16)
        .map_err(|e| PlacementError::format(format!("Invalid block name {}: {}", display_name, e)))
}

/// Render an identity as its lowercase dashed-hex display name.
pub fn decode(identity: u128) -> String {
    let digits = format!("{:0width$x}", identity, width = DISPLAY_HEX_DIGITS);

    let mut display = String::with_capacity(DISPLAY_HEX_DIGITS + GROUPS.len() - 1);
    let mut offset = 0;
    for (index, width) in GROUPS.iter().enumerate() {
        if index > 0 {
            display.push('-');
        }
        display.push_str(&digits[offset..offset + width]);
        offset += width;
    }

    display
}

/// Build the fully-qualified block name `<dataset>#<display>`.
pub fn compose(dataset_name: &str, display_name: &str) -> String {
    format!("{}{}{}", dataset_name, FULL_NAME_DELIMITER, display_name)
}

/// Split a fully-qualified block name into the dataset name and identity.
///
/// The split happens on the first `#`.
pub fn decompose(full_name: &str) -> Result<(String, u128)> {
    let (dataset_name, display_name) = full_name
        .split_once(FULL_NAME_DELIMITER)
        .ok_or_else(|| PlacementError::format(format!("Invalid block name {}", full_name)))?;

    Ok((dataset_name.to_string(), encode(display_name)?))
}

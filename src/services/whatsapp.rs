const WA_BASE: &str = "https://wa.me/";

/// Share text for an album. The URL is included verbatim.
pub fn compose_message(album_name: &str, url: &str) -> String {
    format!(
        "🎉 Check out my sticker album \"{}\"! 🎨\n\n👉 {}\n\n📲 Save the stickers and add them to WhatsApp ✨",
        album_name, url
    )
}

/// `wa.me` deep link carrying `message`, optionally addressed to `phone`.
///
/// The phone number is used as given; callers normalize it.
pub fn build_wa_url(message: &str, phone: Option<&str>) -> String {
    let text = urlencoding::encode(message);
    match phone.filter(|p| !p.is_empty()) {
        Some(phone) => format!("{}{}?text={}", WA_BASE, phone, text),
        None => format!("{}?text={}", WA_BASE, text),
    }
}

/// Keeps only the digits of a user-supplied phone number.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_link_encodes_spaces() {
        let url = build_wa_url("a b", None);
        assert_eq!(url, "https://wa.me/?text=a%20b");
    }

    #[test]
    fn phone_link_targets_number() {
        let url = build_wa_url("a b", Some("62811"));
        assert!(url.starts_with("https://wa.me/62811?text="));
        assert!(url.ends_with("?text=a%20b"));
    }

    #[test]
    fn empty_phone_falls_back_to_generic_link() {
        assert_eq!(build_wa_url("x", Some("")), build_wa_url("x", None));
    }

    #[test]
    fn message_contains_name_and_url_verbatim() {
        let message = compose_message("My Pack", "https://stickers.example/a/my-pack?x=1&y=2");
        assert!(message.contains("\"My Pack\""));
        assert!(message.contains("https://stickers.example/a/my-pack?x=1&y=2"));
    }

    #[test]
    fn composed_message_survives_encoding() {
        let message = compose_message("My Pack", "https://s.example/a/my-pack");
        let url = build_wa_url(&message, None);
        let text = url.strip_prefix("https://wa.me/?text=").unwrap();

        assert!(!text.contains(' '));
        assert_eq!(urlencoding::decode(text).unwrap(), message);
    }

    #[test]
    fn phone_is_reduced_to_digits() {
        assert_eq!(normalize_phone("+62 811-234").as_deref(), Some("62811234"));
        assert_eq!(normalize_phone("n/a"), None);
    }
}

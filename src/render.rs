use base64ct::{Base64, Encoding};

use crate::address::Address;
use crate::error::Error;
use crate::message::Message;

/// Resolve the sender for a send: the message's own,
/// falling back to the configured default.
pub(crate) fn effective_sender<'a>(
    message: &'a impl Message,
    default_sender: Option<&'a Address>,
) -> Result<&'a Address, Error> {
    message
        .from()
        .or(default_sender)
        .ok_or(Error::MissingSender)
}

/// Render a message into the payload handed to `DATA`: the header
/// block, one empty line, then the base64-encoded body.
///
/// Caller headers come first, in their own order. The renderer then
/// fills in `From`, `To`, `Cc`, `Bcc`, `Subject`, `MIME-Version`,
/// `Content-Type` and `Content-Transfer-Encoding`; a caller value wins
/// for all of these except the transfer encoding, which is always
/// base64. `To` is present even when there are no recipients, while
/// empty `Cc` and `Bcc` lists produce no line at all.
pub fn render(
    message: &impl Message,
    default_sender: Option<&Address>,
) -> Result<String, Error> {
    let sender = effective_sender(message, default_sender)?;

    let mut headers = message.headers().clone();
    headers.set("From", sender.canonical());
    headers.set("To", join_canonical(message.to()));
    if !message.cc().is_empty() {
        headers.set("Cc", join_canonical(message.cc()));
    }
    // Bcc ends up in the header text on purpose; it is never part
    // of the envelope.
    if !message.bcc().is_empty() {
        headers.set("Bcc", join_canonical(message.bcc()));
    }
    headers.set("Subject", message.subject());
    if !headers.contains("MIME-Version") {
        headers.set("MIME-Version", "1.0");
    }
    if !headers.contains("Content-Type") {
        headers.set("Content-Type", "text/html; charset=\"utf-8\"");
    }
    // The renderer owns the transfer encoding.
    headers.set("Content-Transfer-Encoding", "base64");

    let mut payload = String::new();
    for (name, value) in headers.iter() {
        payload.push_str(name);
        payload.push_str(": ");
        payload.push_str(value);
        payload.push_str("\r\n");
    }
    payload.push_str("\r\n");
    payload.push_str(&Base64::encode_string(message.body().as_bytes()));
    Ok(payload)
}

fn join_canonical(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(Address::canonical)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use mailparse::MailHeaderMap;

    use super::render;
    use crate::address::Address;
    use crate::error::Error;
    use crate::message::Email;

    fn addr(spec: &str) -> Address {
        Address::new(spec).unwrap()
    }

    fn sample() -> Email {
        Email::new(addr("a@x.com"), vec![addr("b@x.com")], "Hi", "hello")
    }

    #[test]
    fn payload_is_headers_blank_line_base64_body() {
        let payload = render(&sample(), None).unwrap();
        let (head, body) = payload.split_once("\r\n\r\n").unwrap();
        assert!(head.contains("From: a@x.com"));
        assert!(head.contains("Subject: Hi"));
        assert_eq!(body, "aGVsbG8=");
    }

    #[test]
    fn transport_headers_in_order_when_caller_sets_none() {
        let payload = render(&sample(), None).unwrap();
        let head: Vec<&str> = payload
            .split("\r\n")
            .take_while(|line| !line.is_empty())
            .collect();
        assert_eq!(
            head,
            [
                "From: a@x.com",
                "To: b@x.com",
                "Subject: Hi",
                "MIME-Version: 1.0",
                "Content-Type: text/html; charset=\"utf-8\"",
                "Content-Transfer-Encoding: base64",
            ]
        );
    }

    #[test]
    fn caller_headers_come_first() {
        let mut email = sample();
        email.headers.add("X-Mailer", "smtp-mailer");
        let payload = render(&email, None).unwrap();
        assert!(payload.starts_with("X-Mailer: smtp-mailer\r\n"));
    }

    #[test]
    fn caller_content_type_is_kept_in_place() {
        let mut email = sample();
        email.headers.set("Content-Type", "text/plain");
        let payload = render(&email, None).unwrap();
        assert!(payload.starts_with("Content-Type: text/plain\r\n"));
        assert!(!payload.contains("text/html"));
        assert!(!payload.contains("MIME-Version: 1.0\r\nContent-Type"));
    }

    #[test]
    fn transfer_encoding_is_always_base64() {
        let mut email = sample();
        email.headers.set("Content-Transfer-Encoding", "7bit");
        let payload = render(&email, None).unwrap();
        assert!(payload.starts_with("Content-Transfer-Encoding: base64\r\n"));
        assert!(!payload.contains("7bit"));
    }

    #[test]
    fn empty_recipient_lists() {
        let mut email = Email::default();
        email.from = Some(addr("a@x.com"));
        email.subject = "Hi".to_string();
        let payload = render(&email, None).unwrap();
        assert!(payload.contains("To: \r\n"));
        assert!(!payload.contains("Cc:"));
        assert!(!payload.contains("Bcc:"));
    }

    #[test]
    fn cc_and_bcc_are_rendered_into_headers() {
        let mut email = sample();
        email.cc = vec![Address::with_name("c@x.com", "Carol").unwrap()];
        email.bcc = vec![addr("d@x.com"), addr("e@x.com")];
        let payload = render(&email, None).unwrap();
        assert!(payload.contains("Cc: Carol <c@x.com>\r\n"));
        assert!(payload.contains("Bcc: d@x.com, e@x.com\r\n"));
    }

    #[test]
    fn missing_sender_renders_nothing() {
        let email = Email::default();
        assert!(matches!(render(&email, None), Err(Error::MissingSender)));
    }

    #[test]
    fn default_sender_fills_the_from_header() {
        let mut email = sample();
        email.from = None;
        let default = Address::with_name("noreply@x.com", "Noreply").unwrap();
        let payload = render(&email, Some(&default)).unwrap();
        assert!(payload.contains("From: Noreply <noreply@x.com>\r\n"));
    }

    #[test]
    fn own_sender_wins_over_default() {
        let default = addr("noreply@x.com");
        let payload = render(&sample(), Some(&default)).unwrap();
        assert!(payload.contains("From: a@x.com\r\n"));
        assert!(!payload.contains("noreply@x.com"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut email = sample();
        email.cc = vec![addr("c@x.com")];
        email.headers.add("X-Mailer", "smtp-mailer");
        let first = render(&email, None).unwrap();
        let second = render(&email, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_body_renders_an_empty_segment() {
        let mut email = sample();
        email.body = String::new();
        let payload = render(&email, None).unwrap();
        assert!(payload.ends_with("\r\n\r\n"));
    }

    #[test]
    fn addresses_survive_a_round_trip_through_parsing() {
        let email = Email::new(
            Address::with_name("a@x.com", "Ann").unwrap(),
            vec![Address::with_name("b@x.com", "Bob").unwrap()],
            "Hi",
            "body",
        );
        let payload = render(&email, None).unwrap();
        let parsed = mailparse::parse_mail(payload.as_bytes()).unwrap();
        for (header, address, name) in [("From", "a@x.com", "Ann"), ("To", "b@x.com", "Bob")] {
            let value = parsed.headers.get_first_value(header).unwrap();
            let mailboxes = mailparse::addrparse(&value).unwrap();
            match &mailboxes[0] {
                mailparse::MailAddr::Single(info) => {
                    assert_eq!(info.addr, address);
                    assert_eq!(info.display_name.as_deref(), Some(name));
                }
                other => panic!("unexpected mailbox {other:?}"),
            }
        }
    }
}

//! Exchange Web Services sink
//!
//! Saves each transferred message into the destination mailbox's
//! inbox with a SOAP `CreateItem` call. The message object is built
//! directly from the raw RFC 822 bytes (`MimeContent`, base64); the
//! payload is never parsed or reconstructed. One extended MAPI
//! property is stamped on every saved item so transferred messages
//! are distinguishable inside the destination mailbox.
//!
//! The HTTP session is created lazily on the first delivery and
//! reused for the rest of the run. It is never invalidated: a
//! persistent failure (expired credentials, unreachable server)
//! recurs on every remaining message and aborts the run each time.

use crate::config::EwsConfig;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::sink::DeliverySink;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use tracing::{debug, info};

/// PidTagMessageFlags. Stamped with [`TRANSFER_MARKER`] on every
/// saved item; value 1 marks the stored copy as read.
const MESSAGE_FLAGS_TAG: &str = "0x0E07";
const TRANSFER_MARKER: i32 = 1;

/// Sink that saves messages into an Exchange mailbox over EWS.
pub struct EwsSink {
    config: EwsConfig,
    session: Option<EwsSession>,
}

/// The lazily-created, run-scoped destination session.
struct EwsSession {
    http: reqwest::Client,
    endpoint: String,
}

impl EwsSink {
    #[must_use]
    pub const fn new(config: EwsConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Whether the destination session has been established yet.
    #[must_use]
    pub const fn session_open(&self) -> bool {
        self.session.is_some()
    }

    fn session(&mut self) -> Result<&EwsSession> {
        if self.session.is_none() {
            let http = reqwest::Client::builder()
                .build()
                .map_err(|e| Error::Delivery(format!("EWS client setup failed: {e}")))?;
            let endpoint = self.config.endpoint();
            info!("Opening EWS session to {}", endpoint);
            self.session = Some(EwsSession { http, endpoint });
        }
        self.session
            .as_ref()
            .ok_or_else(|| Error::Delivery("EWS session unavailable".to_string()))
    }
}

impl DeliverySink for EwsSink {
    async fn deliver(&mut self, envelope: &Envelope) -> Result<()> {
        let username = self.config.username.clone();
        let password = self.config.password.clone();
        let mailbox_address = self.config.mailbox_address.clone();
        let session = self.session()?;

        let mime_content = BASE64.encode(&envelope.raw);
        let request = create_item_request(&mailbox_address, &mime_content);

        let response = session
            .http
            .post(&session.endpoint)
            .basic_auth(&username, Some(&password))
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(request)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("EWS request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Delivery(format!("EWS response read failed: {e}")))?;

        if !status.is_success() {
            return Err(Error::Delivery(format!("EWS returned HTTP {status}")));
        }

        check_create_item_response(&body)
            .map_err(|reason| Error::Delivery(format!("EWS save failed: {reason}")))?;

        debug!(
            "Saved {} into {} inbox",
            envelope.correlation_id(),
            mailbox_address
        );
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "EWS"
    }
}

/// Render the `CreateItem` SOAP envelope for one message.
fn create_item_request(mailbox_address: &str, mime_content: &str) -> String {
    let address = escape(mailbox_address);
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <soap:Envelope \
         xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:t=\"http://schemas.microsoft.com/exchange/services/2006/types\" \
         xmlns:m=\"http://schemas.microsoft.com/exchange/services/2006/messages\">\
         <soap:Header>\
         <t:RequestServerVersion Version=\"Exchange2013_SP1\"/>\
         </soap:Header>\
         <soap:Body>\
         <m:CreateItem MessageDisposition=\"SaveOnly\">\
         <m:SavedItemFolderId>\
         <t:DistinguishedFolderId Id=\"inbox\">\
         <t:Mailbox><t:EmailAddress>{address}</t:EmailAddress></t:Mailbox>\
         </t:DistinguishedFolderId>\
         </m:SavedItemFolderId>\
         <m:Items>\
         <t:Message>\
         <t:MimeContent CharacterSet=\"UTF-8\">{mime_content}</t:MimeContent>\
         <t:ExtendedProperty>\
         <t:ExtendedFieldURI PropertyTag=\"{MESSAGE_FLAGS_TAG}\" PropertyType=\"Integer\"/>\
         <t:Value>{TRANSFER_MARKER}</t:Value>\
         </t:ExtendedProperty>\
         </t:Message>\
         </m:Items>\
         </m:CreateItem>\
         </soap:Body>\
         </soap:Envelope>"
    )
}

/// Check the `CreateItemResponseMessage` for success.
///
/// Returns the server's `MessageText` (or the response class) as the
/// error when the save was not accepted.
fn check_create_item_response(body: &str) -> std::result::Result<(), String> {
    let mut reader = Reader::from_str(body);
    let mut response_class: Option<String> = None;
    let mut message_text: Option<String> = None;
    let mut in_message_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                if e.local_name().as_ref().ends_with(b"ResponseMessage") {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"ResponseClass" {
                            response_class =
                                Some(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                    }
                } else if e.local_name().as_ref() == b"MessageText" {
                    in_message_text = true;
                }
            }
            Ok(Event::Text(t)) if in_message_text => {
                if let Ok(text) = t.unescape() {
                    message_text = Some(text.trim().to_string());
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"MessageText" => {
                in_message_text = false;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("unparseable response: {e}")),
        }
    }

    match response_class.as_deref() {
        Some("Success") => Ok(()),
        Some(class) => Err(message_text.unwrap_or_else(|| format!("ResponseClass {class}"))),
        None => Err("response carried no ResponseClass".to_string()),
    }
}

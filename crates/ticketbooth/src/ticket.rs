//! Core ticket types for ticketbooth.
//!
//! A [`TicketRecord`] is one submitted identity form together with the QR
//! image generated for it. Records are created once and never edited; the
//! store only ever appends or removes them.

use std::io::Cursor;

use image::{GrayImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// The four text fields collected for a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Display nickname.
    pub nickname: String,
    /// Contact email address.
    pub email: String,
}

impl Identity {
    /// Create an identity from its four fields.
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        nickname: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            nickname: nickname.into(),
            email: email.into(),
        }
    }

    /// The text encoded into the ticket's QR symbol.
    ///
    /// One `Label: value` line per field, without a trailing newline.
    #[must_use]
    pub fn qr_payload(&self) -> String {
        format!(
            "FName: {}\nLName: {}\nNickname: {}\nEmail: {}",
            self.first_name, self.last_name, self.nickname, self.email
        )
    }
}

/// A generated ticket.
///
/// Serialized with camel-case field names; the QR image travels as a
/// standard base64 string (or `null` when absent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    id: Uuid,
    first_name: String,
    last_name: String,
    nickname: String,
    email: String,
    #[serde(default, alias = "qrCodeImage", with = "base64_bytes")]
    qr_image: Option<Vec<u8>>,
}

impl TicketRecord {
    /// Create a ticket with a fresh id.
    ///
    /// The image, if any, is encoded to PNG immediately so the record only
    /// ever holds storable bytes. If PNG encoding fails the ticket is
    /// created without an image.
    #[must_use]
    pub fn new(identity: Identity, qr_image: Option<&GrayImage>) -> Self {
        let png = qr_image.and_then(|img| match encode_png(img) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Dropping QR image, PNG encoding failed: {}", e);
                None
            }
        });
        Self::with_png(identity, png)
    }

    /// Create a ticket with a fresh id from already-encoded PNG bytes.
    #[must_use]
    pub fn with_png(identity: Identity, qr_png: Option<Vec<u8>>) -> Self {
        let Identity {
            first_name,
            last_name,
            nickname,
            email,
        } = identity;
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            nickname,
            email,
            qr_image: qr_png,
        }
    }

    /// Unique, immutable identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Given name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Family name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Display nickname.
    #[must_use]
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Contact email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// PNG bytes of the QR image, if one was generated.
    #[must_use]
    pub fn qr_image(&self) -> Option<&[u8]> {
        self.qr_image.as_deref()
    }

    /// Whether a QR image is attached.
    #[must_use]
    pub fn has_qr_image(&self) -> bool {
        self.qr_image.is_some()
    }

    /// A copy of the four text fields.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(
            self.first_name.clone(),
            self.last_name.clone(),
            self.nickname.clone(),
            self.email.clone(),
        )
    }

    /// The text this ticket's QR image encodes.
    #[must_use]
    pub fn qr_payload(&self) -> String {
        self.identity().qr_payload()
    }
}

/// Encode a grayscale raster as PNG.
///
/// # Errors
///
/// Returns an error if the image encoder fails.
pub fn encode_png(img: &GrayImage) -> image::ImageResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

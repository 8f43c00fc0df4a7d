//! Content pieces and contlets.
//!
//! A content piece is an ordered assembly of contlets. A contlet is an atomic
//! unit of content whose variant is determined by which variant table holds
//! its row; in Rust it is a plain sum type and callers never probe tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result, entity::EntityId, taxonomy::Tag};

// ─── Content pieces ──────────────────────────────────────────────────────────

/// Publication state of a content piece.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PieceStatus {
  #[default]
  Draft,
  Published,
  Archived,
}

/// A row of `content_piece`. Also serves as the lightweight listing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPiece {
  pub id:         EntityId,
  /// Free-form sub-kind, e.g. `blog_post`.
  pub class:      String,
  pub title:      String,
  /// Server-assigned; never changes after creation.
  pub created_at: DateTime<Utc>,
  pub status:     PieceStatus,
}

/// Input to [`crate::store::ContentFacade::create_piece`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewContentPiece {
  pub class:  String,
  pub title:  String,
  #[serde(default)]
  pub status: PieceStatus,
}

impl NewContentPiece {
  pub fn new(class: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      class:  class.into(),
      title:  title.into(),
      status: PieceStatus::default(),
    }
  }
}

/// Replacement values for the mutable columns of a content piece.
#[derive(Debug, Clone, Deserialize)]
pub struct PieceUpdate {
  pub class:  String,
  pub title:  String,
  pub status: PieceStatus,
}

/// A content piece materialised with its ordered contlets and its tags.
#[derive(Debug, Clone, Serialize)]
pub struct PieceDetail {
  pub piece:    ContentPiece,
  pub contlets: Vec<PlacedContlet>,
  pub tags:     Vec<Tag>,
}

// ─── Contlets ────────────────────────────────────────────────────────────────

/// The closed set of contlet variants, one per variant table.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContletVariant {
  Paragraph,
  Image,
  Heading,
}

impl ContletVariant {
  /// The class table holding rows of this variant.
  pub fn table(self) -> &'static str {
    match self {
      Self::Paragraph => "contlet_paragraph",
      Self::Image => "contlet_image",
      Self::Heading => "contlet_heading",
    }
  }
}

/// Variant-specific payload of a contlet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ContletBody {
  Paragraph {
    text: String,
  },
  Image {
    /// Source URI.
    src:      String,
    alt_text: Option<String>,
    width:    Option<u32>,
    height:   Option<u32>,
  },
  Heading {
    text:  String,
    /// 1 through 6.
    level: u8,
  },
}

impl ContletBody {
  pub fn variant(&self) -> ContletVariant {
    match self {
      Self::Paragraph { .. } => ContletVariant::Paragraph,
      Self::Image { .. } => ContletVariant::Image,
      Self::Heading { .. } => ContletVariant::Heading,
    }
  }

  /// Reject payloads the schema would refuse, before any write is issued.
  pub fn validate(&self) -> Result<()> {
    match self {
      Self::Heading { level, .. } if !(1..=6).contains(level) => {
        Err(Error::InvalidArgument(format!(
          "heading level must be between 1 and 6, got {level}"
        )))
      }
      Self::Image { src, .. } if src.is_empty() => Err(Error::InvalidArgument(
        "image source must not be empty".to_owned(),
      )),
      _ => Ok(()),
    }
  }

  /// Short human-readable text for listings.
  pub fn preview(&self) -> &str {
    match self {
      Self::Paragraph { text } | Self::Heading { text, .. } => text,
      Self::Image { src, .. } => src,
    }
  }
}

/// A resolved contlet: identity plus its single variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contlet {
  pub id:   EntityId,
  #[serde(flatten)]
  pub body: ContletBody,
}

/// Flat projection of a contlet: the variant tag plus the superset of all
/// variant fields, absent ones left as `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContletRecord {
  pub id:           EntityId,
  pub variant:      Option<ContletVariant>,
  pub text_content: Option<String>,
  pub src:          Option<String>,
  pub alt_text:     Option<String>,
  pub width:        Option<u32>,
  pub height:       Option<u32>,
  pub level:        Option<u8>,
}

impl From<&Contlet> for ContletRecord {
  fn from(c: &Contlet) -> Self {
    let mut record = ContletRecord {
      id:           c.id,
      variant:      Some(c.body.variant()),
      text_content: None,
      src:          None,
      alt_text:     None,
      width:        None,
      height:       None,
      level:        None,
    };
    match &c.body {
      ContletBody::Paragraph { text } => {
        record.text_content = Some(text.clone());
      }
      ContletBody::Image { src, alt_text, width, height } => {
        record.src = Some(src.clone());
        record.alt_text = alt_text.clone();
        record.width = *width;
        record.height = *height;
      }
      ContletBody::Heading { text, level } => {
        record.text_content = Some(text.clone());
        record.level = Some(*level);
      }
    }
    record
  }
}

/// Listing row for the contlet index view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContletSummary {
  pub id:      EntityId,
  pub variant: ContletVariant,
  pub preview: String,
}

/// A contlet at its position inside a content piece.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedContlet {
  pub sort_key: i64,
  #[serde(flatten)]
  pub contlet:  Contlet,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;

  #[test]
  fn heading_level_is_bounded() {
    for level in [0, 7] {
      let body = ContletBody::Heading { text: "x".into(), level };
      assert_eq!(body.validate().unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
    let body = ContletBody::Heading { text: "x".into(), level: 6 };
    assert!(body.validate().is_ok());
  }

  #[test]
  fn record_projection_fills_only_variant_fields() {
    let image = Contlet {
      id:   EntityId(7),
      body: ContletBody::Image {
        src:      "/img/a.png".into(),
        alt_text: Some("a".into()),
        width:    Some(640),
        height:   None,
      },
    };
    let record = ContletRecord::from(&image);
    assert_eq!(record.id, EntityId(7));
    assert_eq!(serde_json::to_value(&record).unwrap()["id"], 7);
    assert_eq!(record.variant, Some(ContletVariant::Image));
    assert_eq!(record.src.as_deref(), Some("/img/a.png"));
    assert_eq!(record.width, Some(640));
    assert!(record.text_content.is_none());
    assert!(record.level.is_none());
  }

  #[test]
  fn contlet_json_is_tagged_by_variant() {
    let heading = Contlet {
      id:   EntityId(3),
      body: ContletBody::Heading { text: "Core Philosophy".into(), level: 1 },
    };
    let json = serde_json::to_value(&heading).unwrap();
    assert_eq!(
      json,
      serde_json::json!({
        "id": 3,
        "variant": "heading",
        "text": "Core Philosophy",
        "level": 1
      })
    );
  }

  #[test]
  fn variant_names_match_tables() {
    assert_eq!(ContletVariant::Paragraph.to_string(), "paragraph");
    assert_eq!(ContletVariant::Heading.table(), "contlet_heading");
    assert_eq!("image".parse::<ContletVariant>().unwrap(), ContletVariant::Image);
  }
}

//! The fixed schema of a campaign brief.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key of the completion flag carried alongside the brief fields.
pub const COMPLETION_FLAG: &str = "datos_completos";

/// A field of the campaign brief, named by its canonical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BriefField {
    #[serde(rename = "ContentType")]
    ContentType,
    #[serde(rename = "Description")]
    Description,
    #[serde(rename = "Objective")]
    Objective,
    #[serde(rename = "observations")]
    Observations,
    #[serde(rename = "publishing_channel")]
    PublishingChannel,
    #[serde(rename = "publication_date")]
    PublicationDate,
}

impl BriefField {
    /// Every brief field, in the order the model is asked for them.
    pub const ALL: [BriefField; 6] = [
        BriefField::ContentType,
        BriefField::Description,
        BriefField::Objective,
        BriefField::Observations,
        BriefField::PublishingChannel,
        BriefField::PublicationDate,
    ];

    /// Canonical key used in the data record and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            BriefField::ContentType => "ContentType",
            BriefField::Description => "Description",
            BriefField::Objective => "Objective",
            BriefField::Observations => "observations",
            BriefField::PublishingChannel => "publishing_channel",
            BriefField::PublicationDate => "publication_date",
        }
    }

    /// Parameter description handed to the model in the function declaration.
    pub fn description(&self) -> &'static str {
        match self {
            BriefField::ContentType => {
                "Tipo de contenido a producir (imagen, video, carrusel, post, etc.)"
            }
            BriefField::Description => "Descripción breve de la campaña o del contenido",
            BriefField::Objective => "Objetivo principal de la campaña",
            BriefField::Observations => "Observaciones o requisitos adicionales del cliente",
            BriefField::PublishingChannel => {
                "Canal o red social donde se publicará (Instagram, Facebook, LinkedIn, etc.)"
            }
            BriefField::PublicationDate => "Fecha objetivo de publicación",
        }
    }
}

impl fmt::Display for BriefField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BriefField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BriefField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// A key that is not part of the brief schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown brief field: {0}")]
pub struct UnknownField(pub String);

// SPDX-License-Identifier: Apache-2.0

use insights_panel_query::{BrandPlatformPair, OutputRecord};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataResponseDto {
    pub brands: Vec<String>,
    pub platforms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataResponseDto {
    pub insights: Vec<OutputRecord>,
    pub brands: Vec<String>,
    pub platforms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairs: Option<Vec<BrandPlatformPair>>,
}

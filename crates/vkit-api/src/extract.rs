//! # Validated-Value Handoff
//!
//! A validation layer stores the normalized value of its section in the
//! [`ValidatedSections`] request extension. Handlers read it back through
//! [`ValidatedBody`], [`ValidatedQuery`] and [`ValidatedParams`], or take the
//! whole map. The raw request data is left untouched, so `Json`, `Query` and
//! `Path` still see what the client sent.

use std::collections::BTreeMap;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use serde_json::Value;
use vkit_core::Section;

use crate::error::ApiError;

/// Normalized section values of one request, keyed by section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedSections {
    values: BTreeMap<Section, Value>,
}

impl ValidatedSections {
    pub fn get(&self, section: Section) -> Option<&Value> {
        self.values.get(&section)
    }

    pub fn insert(&mut self, section: Section, value: Value) {
        self.values.insert(section, value);
    }

    pub fn contains(&self, section: Section) -> bool {
        self.values.contains_key(&section)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Deserializes the stored value for `section` into `T`.
    pub fn parse<T: DeserializeOwned>(&self, section: Section) -> Result<T, ApiError> {
        let value = self.get(section).ok_or(ApiError::MissingSection(section))?;
        T::deserialize(value).map_err(|e| ApiError::Deserialize {
            section,
            reason: e.to_string(),
        })
    }
}

/// Yields an empty map when no layer ran.
impl<S: Send + Sync> FromRequestParts<S> for ValidatedSections {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ValidatedSections>()
            .cloned()
            .unwrap_or_default())
    }
}

fn section_value<T: DeserializeOwned>(parts: &Parts, section: Section) -> Result<T, ApiError> {
    parts
        .extensions
        .get::<ValidatedSections>()
        .ok_or(ApiError::MissingSection(section))?
        .parse(section)
}

/// The validated request body.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBody<T>(pub T);

/// The validated query string.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery<T>(pub T);

/// The validated path parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedParams<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        section_value(parts, Section::Body).map(Self)
    }
}

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        section_value(parts, Section::Query).map(Self)
    }
}

impl<T, S> FromRequestParts<S> for ValidatedParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        section_value(parts, Section::Params).map(Self)
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS profile loaders.

pub mod yaml;

pub use yaml::{YamlLoader, YamlQosDocument, YamlQosProfile};

// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

pub mod hashing_service;
pub mod json_schema;
pub mod override_evaluator;
pub mod permission_service;
pub mod token_codec;

// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules. Each function takes `&Database` and runs on the single
//! writer thread.

pub mod candidates;
pub mod cursors;
pub mod messages;

// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage variant payloads, one module per family.

pub mod jenkins;
pub mod manual_judgment;
pub mod target_server_group;
pub mod wait;

// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod products;
pub mod branches;
pub mod sales;
pub mod search;
pub mod reports;
pub mod trends;
pub mod exporter;
pub mod rate;
pub mod doctor;

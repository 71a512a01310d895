// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the command line to the upright backend crates.
//
// `walk` finds the images to work on; `batch` runs the shared engine over them
// on blocking workers and turns the results into report lines.

pub mod batch;
pub mod walk;

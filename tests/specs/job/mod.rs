// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod cancel;
mod concurrency;
mod lifecycle;
mod logs;
mod restart;
mod submit;

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod qualify;
mod stage;
mod tags;

pub use qualify::{Episode, QualifyOptions, parse_duration, qualify, weekday_name};
pub use stage::{StageRequest, stage_episode};
pub use tags::{Id3TagWriter, TagWriter};

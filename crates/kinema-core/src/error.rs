// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for loop construction and configuration.

use std::fmt;

/// An error raised while constructing a [`Loop`](crate::Loop).
///
/// Configuration problems fail fast here rather than surfacing later as a
/// loop that never ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// No frame scheduler was supplied and no process-wide default is
    /// installed.
    MissingScheduler,
    /// The requested frame-rate ceiling is not a number.
    InvalidFps {
        /// The rejected value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingScheduler => {
                write!(
                    f,
                    "No frame scheduler configured: set `LoopConfig::scheduler` or install a process default."
                )
            }
            ConfigError::InvalidFps { value } => {
                write!(f, "Invalid fps limit: {value} is not a number.")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::MissingScheduler;
        assert_eq!(
            format!("{err}"),
            "No frame scheduler configured: set `LoopConfig::scheduler` or install a process default."
        );

        let err_fps = ConfigError::InvalidFps { value: f64::NAN };
        assert_eq!(format!("{err_fps}"), "Invalid fps limit: NaN is not a number.");
    }
}

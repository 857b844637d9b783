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

// Kinema Sandbox
// Main binary for testing and demos: a 30fps loop over a 60Hz timer,
// completed from inside an update listener after 30 frames.

use anyhow::Result;
use kinema_core::{running_instances, Loop, LoopConfig, LoopEvent};
use kinema_infra::TimerScheduler;

const TARGET_FRAMES: u64 = 30;

fn main() -> Result<()> {
    env_logger::init();

    TimerScheduler::install_as_default()?;

    let animation = Loop::new(LoopConfig {
        fps: Some(30.0),
        ..LoopConfig::default()
    })?;

    // Channel bridge for the main thread; listeners run on the timer thread.
    let events = animation.events();

    animation.on_update(|tick| {
        log::info!(
            "frame {:>3}  dt {:6.2}ms  elapsed {:8.2}ms",
            tick.frame_count,
            tick.delta_time,
            tick.elapsed_time
        );
    });
    {
        let handle = animation.clone();
        animation.on_update(move |tick| {
            if tick.frame_count >= TARGET_FRAMES {
                handle.complete();
            }
        });
    }

    animation.start();
    log::info!("{} loop(s) running", running_instances());

    for (event, tick) in events.iter() {
        match event {
            LoopEvent::Complete => {
                println!(
                    "completed after {} frames, {:.1}ms elapsed, ~{:.1} fps measured",
                    tick.frame_count,
                    tick.elapsed_time,
                    animation.fps()
                );
                break;
            }
            LoopEvent::Stop => log::debug!("loop stopped at frame {}", tick.frame_count),
            _ => {}
        }
    }

    animation.dispose();
    Ok(())
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Pull;
use crate::{AnimationView, Color, Header, IciclesError, RadioPanelView, Result, VisualFrame};

/// One entry of a pre-authored animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileFrame {
    /// Full set of pixels shown for `duration_ms`.
    Visual { duration_ms: u64, pixels: Vec<Color> },
    /// Keeps the current pixels on screen for another `duration_ms`.
    Delay { duration_ms: u64 },
    /// Changes one radio panel, or all of them for panel 0. Emits nothing.
    RadioColor { panel: u32, color: Color },
}

impl FileFrame {
    fn is_displayed(&self) -> bool {
        !matches!(self, FileFrame::RadioColor { .. })
    }
}

#[derive(Serialize, Deserialize)]
struct AnimationFile {
    header: Header,
    frames: Vec<FileFrame>,
}

#[derive(Debug, Clone)]
struct Cursor {
    loop_index: u32,
    frame_index: usize,
    produced: usize,
    pixels: Vec<Color>,
    radio_panels: Vec<RadioPanelView>,
}

impl Cursor {
    fn rewound(header: &Header) -> Self {
        Self {
            loop_index: 0,
            frame_index: 0,
            produced: 0,
            pixels: vec![Color::default(); header.pixels_count()],
            radio_panels: RadioPanelView::all(header.panels_count(), Color::default()),
        }
    }
}

/// Replays decoded frames, `loops_count` times over.
#[derive(Debug, Clone)]
pub struct FileAnimation {
    header: Header,
    frames: Vec<FileFrame>,
    cursor: Cursor,
}

impl FileAnimation {
    /// Validates `frames` against `header`.
    pub fn new(header: Header, frames: Vec<FileFrame>) -> Result<Self> {
        header.validate()?;
        let pixels_count = header.pixels_count();
        for (index, frame) in frames.iter().enumerate() {
            match frame {
                FileFrame::Visual { pixels, .. } if pixels.len() != pixels_count => {
                    return Err(IciclesError::decode(format!(
                        "frame {index} has {} pixels, header declares {pixels_count}",
                        pixels.len()
                    )));
                }
                FileFrame::RadioColor { panel, .. } if *panel > header.radio_panels_count => {
                    return Err(IciclesError::decode(format!(
                        "frame {index} targets radio panel {panel}, header declares {}",
                        header.radio_panels_count
                    )));
                }
                _ => {}
            }
        }

        Ok(Self {
            cursor: Cursor::rewound(&header),
            header,
            frames,
        })
    }

    /// Decodes a JSON animation container.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let file: AnimationFile = serde_json::from_slice(bytes)?;
        Self::new(file.header, file.frames)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let file = AnimationFile {
            header: self.header.clone(),
            frames: self.frames.clone(),
        };
        Ok(serde_json::to_vec_pretty(&file)?)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn frames(&self) -> &[FileFrame] {
        &self.frames
    }

    fn loops(&self) -> u32 {
        self.header.loops_count.max(1)
    }

    /// Views yielded by one full play, across all loops.
    pub fn animation_frames_count(&self) -> usize {
        self.frames.iter().filter(|frame| frame.is_displayed()).count() * self.loops() as usize
    }

    pub fn play(&mut self) {
        self.cursor = Cursor::rewound(&self.header);
    }

    pub fn pull_next(&mut self) -> Pull {
        loop {
            if self.cursor.frame_index >= self.frames.len() {
                self.cursor.loop_index += 1;
                if self.cursor.loop_index >= self.loops() || self.frames.is_empty() {
                    return Pull::Ended;
                }
                self.cursor.frame_index = 0;
            }

            let frame = &self.frames[self.cursor.frame_index];
            self.cursor.frame_index += 1;

            let duration_ms = match frame {
                FileFrame::Visual {
                    duration_ms,
                    pixels,
                } => {
                    self.cursor.pixels.clone_from(pixels);
                    *duration_ms
                }
                FileFrame::Delay { duration_ms } => *duration_ms,
                FileFrame::RadioColor { panel, color } => {
                    for view in &mut self.cursor.radio_panels {
                        if *panel == RadioPanelView::BROADCAST_INDEX || view.index == *panel {
                            view.color = *color;
                        }
                    }
                    continue;
                }
            };

            self.cursor.produced += 1;
            return Pull::Frame(AnimationView::new(
                VisualFrame::new(Duration::from_millis(duration_ms), self.cursor.pixels.clone()),
                self.cursor.radio_panels.clone(),
            ));
        }
    }

    pub fn progress(&self) -> f64 {
        let total = self.animation_frames_count();
        if total == 0 {
            0.0
        } else {
            self.cursor.produced as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors;

    fn header(loops_count: u32) -> Header {
        Header {
            loops_count,
            ..Header::new("file", 2, 1, 2)
        }
    }

    fn visual(ms: u64, color: Color) -> FileFrame {
        FileFrame::Visual {
            duration_ms: ms,
            pixels: vec![color; 2],
        }
    }

    fn durations(animation: &mut FileAnimation) -> Vec<u64> {
        std::iter::from_fn(|| animation.pull_next().into_view())
            .map(|view| view.frame.duration.as_millis() as u64)
            .collect()
    }

    #[test]
    fn replays_frames_then_ends() {
        let frames = vec![visual(10, colors::RED), FileFrame::Delay { duration_ms: 30 }];
        let mut animation = FileAnimation::new(header(1), frames).unwrap();
        assert_eq!(animation.animation_frames_count(), 2);

        let first = animation.pull_next().into_view().unwrap();
        assert_eq!(first.frame.pixels, vec![colors::RED; 2]);
        let delay = animation.pull_next().into_view().unwrap();
        assert_eq!(delay.frame.pixels, vec![colors::RED; 2]);
        assert_eq!(delay.frame.duration, Duration::from_millis(30));
        assert_eq!(animation.progress(), 1.0);
        assert_eq!(animation.pull_next(), Pull::Ended);
        assert_eq!(animation.pull_next(), Pull::Ended);

        animation.play();
        assert_eq!(durations(&mut animation), vec![10, 30]);
    }

    #[test]
    fn loops_the_configured_number_of_times() {
        let frames = vec![visual(5, colors::BLUE), visual(7, colors::RED)];
        let mut animation = FileAnimation::new(header(3), frames).unwrap();
        assert_eq!(animation.animation_frames_count(), 6);
        assert_eq!(durations(&mut animation), vec![5, 7, 5, 7, 5, 7]);
    }

    #[test]
    fn radio_colors_update_panels_without_emitting() {
        let frames = vec![
            FileFrame::RadioColor {
                panel: 0,
                color: colors::BLUE,
            },
            FileFrame::RadioColor {
                panel: 2,
                color: colors::RED,
            },
            visual(10, colors::WHITE),
        ];
        let mut animation = FileAnimation::new(header(1), frames).unwrap();
        assert_eq!(animation.animation_frames_count(), 1);

        let view = animation.pull_next().into_view().unwrap();
        assert_eq!(view.radio_panels[0], RadioPanelView::new(1, colors::BLUE));
        assert_eq!(view.radio_panels[1], RadioPanelView::new(2, colors::RED));
    }

    #[test]
    fn empty_animation_ends_immediately() {
        let mut animation = FileAnimation::new(header(5), Vec::new()).unwrap();
        assert_eq!(animation.pull_next(), Pull::Ended);
        assert_eq!(animation.progress(), 0.0);
    }

    #[test]
    fn decode_validates_against_header() {
        let bad_pixels = br#"{"header":{"name":"x","x_count":2,"y_count":2,"radio_panels_count":1},
            "frames":[{"type":"visual","duration_ms":20,"pixels":[0]}]}"#;
        let err = FileAnimation::decode(bad_pixels).unwrap_err();
        assert!(format!("{err}").contains("1 pixels"));

        let bad_panel = br#"{"header":{"name":"x","x_count":1,"y_count":1,"radio_panels_count":1},
            "frames":[{"type":"radio_color","panel":2,"color":0}]}"#;
        assert!(FileAnimation::decode(bad_panel).is_err());

        let too_many_panels = br#"{"header":{"name":"x","x_count":1,"y_count":1,"radio_panels_count":300},
            "frames":[]}"#;
        assert!(matches!(
            FileAnimation::decode(too_many_panels),
            Err(IciclesError::Decode(_))
        ));
    }

    #[test]
    fn encode_and_decode_agree() {
        let frames = vec![visual(10, colors::ORANGE), FileFrame::Delay { duration_ms: 5 }];
        let animation = FileAnimation::new(header(2), frames).unwrap();
        let decoded = FileAnimation::decode(&animation.encode().unwrap()).unwrap();
        assert_eq!(decoded.header(), animation.header());
        assert_eq!(decoded.frames(), animation.frames());
    }
}

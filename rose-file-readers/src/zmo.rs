use std::time::Duration;

use crate::{
    reader::RoseFileReader,
    types::{Quat4, Vec2, Vec3},
    ReadError, RoseFile,
};

#[derive(Clone, Debug, PartialEq)]
pub enum ZmoChannel {
    Empty,
    Position(Vec<Vec3<f32>>),
    Rotation(Vec<Quat4<f32>>),
    Normal(Vec<Vec3<f32>>),
    Alpha(Vec<f32>),
    UV1(Vec<Vec2<f32>>),
    UV2(Vec<Vec2<f32>>),
    UV3(Vec<Vec2<f32>>),
    UV4(Vec<Vec2<f32>>),
    Texture(Vec<f32>),
    Scale(Vec<f32>),
}

impl ZmoChannel {
    fn with_type(channel_type: u32, num_frames: usize) -> Result<Self, ReadError> {
        Ok(match channel_type {
            1 => ZmoChannel::Empty,
            2 => ZmoChannel::Position(Vec::with_capacity(num_frames)),
            4 => ZmoChannel::Rotation(Vec::with_capacity(num_frames)),
            8 => ZmoChannel::Normal(Vec::with_capacity(num_frames)),
            16 => ZmoChannel::Alpha(Vec::with_capacity(num_frames)),
            32 => ZmoChannel::UV1(Vec::with_capacity(num_frames)),
            64 => ZmoChannel::UV2(Vec::with_capacity(num_frames)),
            128 => ZmoChannel::UV3(Vec::with_capacity(num_frames)),
            256 => ZmoChannel::UV4(Vec::with_capacity(num_frames)),
            512 => ZmoChannel::Texture(Vec::with_capacity(num_frames)),
            1024 => ZmoChannel::Scale(Vec::with_capacity(num_frames)),
            _ => {
                return Err(ReadError::UnsupportedVariant {
                    what: "ZMO channel type",
                    value: channel_type as i64,
                })
            }
        })
    }

    fn read_frame(&mut self, reader: &mut RoseFileReader) -> Result<(), ReadError> {
        match self {
            ZmoChannel::Empty => {}
            ZmoChannel::Position(frames) | ZmoChannel::Normal(frames) => {
                frames.push(reader.read_vector3_f32()?)
            }
            ZmoChannel::Rotation(frames) => frames.push(reader.read_quat4_wxyz_f32()?),
            ZmoChannel::Alpha(frames) | ZmoChannel::Texture(frames) | ZmoChannel::Scale(frames) => {
                frames.push(reader.read_f32()?)
            }
            ZmoChannel::UV1(frames)
            | ZmoChannel::UV2(frames)
            | ZmoChannel::UV3(frames)
            | ZmoChannel::UV4(frames) => frames.push(reader.read_vector2_f32()?),
        }
        Ok(())
    }
}

pub struct ZmoFile {
    pub fps: usize,
    pub num_frames: usize,
    /// `(bone index, channel)` in file order.
    pub channels: Vec<(u32, ZmoChannel)>,
    pub frame_events: Vec<u16>,
}

#[derive(Default)]
pub struct ZmoReadOptions {
    /// Only read the header and frame events.
    pub skip_animation: bool,
}

impl ZmoFile {
    pub fn get_duration(&self) -> Duration {
        if self.fps == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.num_frames as u64 * 1_000_000_000) / self.fps as u64)
    }

    pub fn channels_for_bone(&self, bone: u32) -> impl Iterator<Item = &ZmoChannel> + '_ {
        self.channels
            .iter()
            .filter(move |(index, _)| *index == bone)
            .map(|(_, channel)| channel)
    }
}

impl RoseFile for ZmoFile {
    type ReadOptions = ZmoReadOptions;

    fn read(
        mut reader: RoseFileReader,
        read_options: &ZmoReadOptions,
    ) -> Result<Self, anyhow::Error> {
        let magic = reader.read_null_terminated_string()?;
        if magic != "ZMO0002" {
            return Err(ReadError::BadMagic {
                expected: "ZMO0002",
                found: magic.into_owned(),
            }
            .into());
        }

        let fps = reader.read_u32()? as usize;
        let num_frames = reader.read_u32()? as usize;
        let num_channels = reader.read_u32()? as usize;

        let mut channels = Vec::new();
        if !read_options.skip_animation {
            channels.reserve_exact(num_channels.min(reader.remaining()));
            for _ in 0..num_channels {
                let channel_type = reader.read_u32()?;
                let bone_index = reader.read_u32()?;
                channels.push((bone_index, ZmoChannel::with_type(channel_type, num_frames)?));
            }

            for _ in 0..num_frames {
                for (_, channel) in channels.iter_mut() {
                    channel.read_frame(&mut reader)?;
                }
            }
        }

        let mut frame_events = Vec::new();
        let len = reader.len() as u64;
        if len >= 8 {
            reader.set_position(len - 4);
            let extended_magic = reader.read_fixed_length_bytes(4)?;
            if extended_magic == b"EZMO" || extended_magic == b"3ZMO" {
                reader.set_position(len - 8);
                let position = reader.read_u32()? as u64;
                reader.set_position(position);

                let num_frame_events = reader.read_u16()? as usize;
                frame_events = reader.read_u16_array(num_frame_events)?;
            }
        }

        Ok(Self {
            fps,
            num_frames,
            channels,
            frame_events,
        })
    }
}

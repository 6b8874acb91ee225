use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use log::debug;
use rose_file_readers::{ZmoChannel, ZmoFile};

use crate::{
    coords::{flip_position, flip_rotation, Transform, UNIT_SCALE},
    scene::{AnimationAsset, AnimationStream, BoneTrack, SkeletonAsset},
};

impl BoneTrack {
    fn rest(bone: usize, rest: Transform, frames: usize) -> Self {
        Self {
            bone,
            streams: Vec::new(),
            positions: vec![rest.translation; frames],
            rotations: vec![rest.rotation; frames],
            scales: vec![rest.scale; frames],
        }
    }

    /// Overwrites one stream with decoded samples. Channels that carry no
    /// transform data are ignored.
    fn apply_channel(&mut self, channel: &ZmoChannel, position_scale: f32) {
        let stream = match channel {
            ZmoChannel::Position(samples) => {
                for (target, sample) in self.positions.iter_mut().zip(samples) {
                    *target = flip_position(*sample) * position_scale;
                }
                AnimationStream::Position
            }
            ZmoChannel::Rotation(samples) => {
                for (target, sample) in self.rotations.iter_mut().zip(samples) {
                    *target = flip_rotation(*sample);
                }
                AnimationStream::Rotation
            }
            ZmoChannel::Scale(samples) => {
                for (target, sample) in self.scales.iter_mut().zip(samples) {
                    *target = Vec3::splat(*sample);
                }
                AnimationStream::Scale
            }
            _ => return,
        };

        if !self.streams.contains(&stream) {
            self.streams.push(stream);
        }
    }

    fn make_relative_to(&mut self, parent: &Transform) {
        for frame in 0..self.positions.len() {
            let sample = Transform::new(
                self.positions[frame],
                self.rotations[frame],
                self.scales[frame],
            )
            .relative_to(parent);
            self.positions[frame] = sample.translation;
            self.rotations[frame] = sample.rotation;
            self.scales[frame] = sample.scale;
        }
    }
}

/// Converts a skeletal animation onto `skeleton`: channels are routed through
/// the skeleton remap, sampled values are flipped and scaled, and every
/// non-root track is expressed relative to its parent's rest pose.
pub fn rebase_animation(path: &str, zmo: &ZmoFile, skeleton: &SkeletonAsset) -> AnimationAsset {
    let frames = zmo.num_frames;
    let mut tracks: BTreeMap<usize, BoneTrack> = BTreeMap::new();

    for (source_bone, channel) in &zmo.channels {
        let bone = match skeleton
            .remap_bone(*source_bone as usize)
            .filter(|&bone| bone < skeleton.bones.len())
        {
            Some(bone) => bone,
            None => {
                debug!(
                    "Dropping channel for bone {} not present in {}",
                    source_bone, skeleton.path
                );
                continue;
            }
        };

        tracks
            .entry(bone)
            .or_insert_with(|| BoneTrack::rest(bone, skeleton.bones[bone].world, frames))
            .apply_channel(channel, UNIT_SCALE);
    }

    let mut tracks: Vec<BoneTrack> = tracks.into_values().collect();
    for track in tracks.iter_mut() {
        if let Some(parent) = skeleton.bones[track.bone].parent {
            track.make_relative_to(&skeleton.bones[parent].world);
        }
    }

    AnimationAsset {
        path: path.to_string(),
        fps: zmo.fps as u32,
        frame_count: frames,
        tracks,
        frame_events: zmo.frame_events.clone(),
    }
}

/// Keeps only the root bone of an object animation. Object animations are
/// already in world units, so positions are flipped but not scaled.
pub fn root_motion(path: &str, zmo: &ZmoFile) -> AnimationAsset {
    let mut track = BoneTrack::rest(0, Transform::IDENTITY, zmo.num_frames);
    for channel in zmo.channels_for_bone(0) {
        track.apply_channel(channel, 1.0);
    }

    let tracks = if track.streams.is_empty() {
        Vec::new()
    } else {
        vec![track]
    };

    AnimationAsset {
        path: path.to_string(),
        fps: zmo.fps as u32,
        frame_count: zmo.num_frames,
        tracks,
        frame_events: zmo.frame_events.clone(),
    }
}

impl AnimationAsset {
    pub fn sample(&self, bone: usize, frame: usize) -> Option<Transform> {
        let track = self.track(bone)?;
        Some(Transform::new(
            *track.positions.get(frame)?,
            track.rotations.get(frame).copied().unwrap_or(Quat::IDENTITY),
            track.scales.get(frame).copied().unwrap_or(Vec3::ONE),
        ))
    }
}

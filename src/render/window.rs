use anyhow::Result;
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};
use opencv::core::{Mat, Vec3b};
use opencv::prelude::*;

use crate::error::PoseError;
use crate::render::canvas::Color;
use crate::render::framebuffer::FrameBuffer;

/// minifbウィンドウ。背景にカメラ映像、その上にオーバーレイを重ねる
pub struct MinifbRenderer {
    window: Window,
    title: String,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    fullscreen: bool,
}

fn window_options(fullscreen: bool) -> WindowOptions {
    if fullscreen {
        WindowOptions {
            borderless: true,
            title: false,
            resize: true,
            scale_mode: minifb::ScaleMode::AspectRatioStretch,
            scale: Scale::FitScreen,
            topmost: true,
            ..WindowOptions::default()
        }
    } else {
        WindowOptions {
            resize: false,
            ..WindowOptions::default()
        }
    }
}

impl MinifbRenderer {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let window = Window::new(title, width, height, window_options(false))?;

        Ok(Self {
            window,
            title: title.to_string(),
            buffer: vec![0u32; width * height],
            width,
            height,
            fullscreen: false,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// 背景を黒で塗る (停止中)
    pub fn clear_background(&mut self) {
        self.buffer.fill(0);
    }

    /// BGR Mat を背景として最近傍で拡大縮小して書き込む
    pub fn draw_frame(&mut self, frame: &Mat) -> Result<()> {
        let frame_width = frame.cols() as usize;
        let frame_height = frame.rows() as usize;
        if frame_width == 0 || frame_height == 0 {
            return Ok(());
        }

        for y in 0..self.height {
            let sy = y * frame_height / self.height;
            for x in 0..self.width {
                let sx = x * frame_width / self.width;
                let pixel = frame.at_2d::<Vec3b>(sy as i32, sx as i32)?;
                let (r, g, b) = (pixel[2] as u32, pixel[1] as u32, pixel[0] as u32);
                self.buffer[y * self.width + x] = (r << 16) | (g << 8) | b;
            }
        }

        Ok(())
    }

    /// オーバーレイを背景の上にアルファ合成する
    pub fn compose(&mut self, overlay: &FrameBuffer) {
        use crate::render::Canvas;
        let (ow, oh) = overlay.size();
        let (ow, oh) = (ow as usize, oh as usize);
        if ow == 0 || oh == 0 {
            return;
        }

        let pixels = overlay.pixels();
        for y in 0..self.height {
            let sy = y * oh / self.height;
            for x in 0..self.width {
                let sx = x * ow / self.width;
                let src = Color::from_argb(pixels[sy * ow + sx]);
                if src.a == 0 {
                    continue;
                }
                let dst = &mut self.buffer[y * self.width + x];
                *dst = over_opaque(*dst, src);
            }
        }
    }

    pub fn update(&mut self) -> Result<()> {
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)?;
        Ok(())
    }

    /// このフレームで押されたキー (リピートなし)
    pub fn pressed_keys(&self) -> Vec<Key> {
        self.window.get_keys_pressed(KeyRepeat::No)
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    /// ウィンドウを作り直して全画面を切り替える。失敗時は元のウィンドウを残す
    pub fn toggle_fullscreen(&mut self) -> crate::error::Result<bool> {
        let target = !self.fullscreen;
        let window = Window::new(&self.title, self.width, self.height, window_options(target))
            .map_err(|e| PoseError::Fullscreen(e.to_string()))?;
        self.window = window;
        self.fullscreen = target;
        crate::log!("[window] fullscreen: {}", target);
        Ok(target)
    }
}

/// 不透明な 0RGB 背景に ARGB を重ねる
fn over_opaque(dst: u32, src: Color) -> u32 {
    let a = src.a as u32;
    let mix = |s: u8, shift: u32| -> u32 {
        let d = (dst >> shift) & 0xff;
        (s as u32 * a + d * (255 - a) + 127) / 255
    };
    (mix(src.r, 16) << 16) | (mix(src.g, 8) << 8) | mix(src.b, 0)
}

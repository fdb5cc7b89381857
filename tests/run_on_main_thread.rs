// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! `MainThreadLoop::run` needs the process's initial thread, which the default test
//! harness does not hand out.  This target runs without it.

use accelerated_pixels::main_thread_loop::{LoopConfig, MainThreadLoop};
use accelerated_pixels::pixel_formats::Color;
use accelerated_pixels::raster::{Device, DeviceConfig, ProgramSource, Renderer, TextureSelection};
use std::thread;

fn main() {
    let main_thread = thread::current().id();
    MainThreadLoop::run(LoopConfig::default().thread_name("run_test"), move |main_loop| {
        assert_eq!(main_loop.thread_id(), main_thread);
        assert_ne!(thread::current().id(), main_thread);
        let name = main_loop.execute(|| thread::current().name().map(str::to_owned));
        assert_eq!(name.as_deref(), Some("main"));

        let device = Device::new(main_loop.clone(), DeviceConfig::default()).expect("device");
        let white = device
            .link_program(ProgramSource::new("white").fragment(|_, _| Color::WHITE))
            .expect("link")
            .accelerated_command(|renderer: &mut Renderer<'_>, _: &[TextureSelection]| {
                renderer.draw_quad();
            });
        let mut image = device.new_image(2, 1).expect("image");
        image.selection(1, 0).with_size(1, 1).modify(&white, &[]);
        image.download();
        assert_eq!(image.pixels(), &[Color::TRANSPARENT, Color::WHITE]);
    })
    .expect("run");
    println!("run_on_main_thread: ok");
}

// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Accelerated commands through the raster backend.

use accelerated_pixels::images::{AcceleratedImage, AcceleratedImageSelection, Image};
use accelerated_pixels::main_thread_loop::{LoopConfig, MainThreadLoop};
use accelerated_pixels::pixel_formats::Color;
use accelerated_pixels::raster::{
    Device, DeviceConfig, DriverError, ProgramCommand, ProgramSource, Renderer, TargetRect,
    TextureSelection, UniformKind, VertexAttribute,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn device(name: &str) -> Device {
    device_with(name, DeviceConfig::default())
}

fn device_with(name: &str, config: DeviceConfig) -> Device {
    let main_loop =
        MainThreadLoop::spawn(LoopConfig::default().thread_name(name)).expect("spawn loop");
    Device::new(main_loop, config.label(name)).expect("device")
}

fn fill_program(device: &Device) -> accelerated_pixels::raster::Program {
    device
        .link_program(
            ProgramSource::new("fill")
                .uniform("color", UniformKind::Vec4)
                .fragment(|_, inputs| inputs.vec4("color").into()),
        )
        .expect("link")
}

fn fill(device: &Device, color: [f32; 4]) -> ProgramCommand {
    fill_program(device).accelerated_command(
        move |renderer: &mut Renderer<'_>, _: &[TextureSelection]| {
            renderer.set_vec4("color", color);
            renderer.draw_quad();
        },
    )
}

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

#[test]
fn draw_lands_at_the_selected_top_left_pixel() {
    let device = device("top_left");
    let mut image = device.new_image(2, 2).unwrap();
    image.selection(0, 0).with_size(1, 1).modify(&fill(&device, RED), &[]);
    image.download();
    let t = Color::TRANSPARENT;
    assert_eq!(image.pixels(), &[Color::rgb(255, 0, 0), t, t, t]);
}

#[test]
fn viewport_and_scissor_are_flipped() {
    let device = device("flip");
    let image = device.new_image(4, 3).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let move_seen = seen.clone();
    let command = fill_program(&device).accelerated_command(
        move |renderer: &mut Renderer<'_>, _: &[TextureSelection]| {
            move_seen.lock().unwrap().push(renderer.viewport());
        },
    );
    image.selection(1, 0).with_size(2, 1).modify(&command, &[]);
    image.selection(0, 2).with_size(9, 9).modify(&command, &[]);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            TargetRect { x: 1, y: 2, width: 2, height: 1 },
            TargetRect { x: 0, y: 0, width: 4, height: 1 },
        ]
    );
    let scissor = device.execute(|context| context.scissor());
    assert_eq!(scissor, Some(TargetRect { x: 0, y: 0, width: 4, height: 1 }));
}

#[test]
fn empty_selection_never_reaches_the_driver() {
    let device = device("empty");
    let mut image = device.new_image(2, 2).unwrap();
    image.whole_selection_mut().fill(Color::WHITE);
    image.upload();
    let calls = Arc::new(AtomicUsize::new(0));
    let move_calls = calls.clone();
    let command = fill_program(&device).accelerated_command(
        move |renderer: &mut Renderer<'_>, _: &[TextureSelection]| {
            move_calls.fetch_add(1, Ordering::SeqCst);
            renderer.clear(Color::BLACK);
        },
    );
    let before = image.accelerated().download_vec();
    image.selection(2, 0).with_size(1, 1).modify(&command, &[]);
    image.selection(-3, 0).with_size(3, 2).modify(&command, &[]);
    image.selection(1, 1).modify(&command, &[]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(device.execute(|context| context.bound_framebuffer()), None);
    image.download();
    assert_eq!(image.pixels(), &before[..]);
}

#[test]
fn partially_visible_selection_is_truncated() {
    let device = device("truncate");
    let mut image = device.new_image(1, 1).unwrap();
    image.selection(-1, 0).with_size(2, 1).modify(&fill(&device, RED), &[]);
    image.download();
    assert_eq!(image.pixels(), &[Color::rgb(255, 0, 0)]);
}

#[test]
fn copy_reads_the_input_selection() {
    let device = device("copy");
    let mut source = device.new_image(2, 2).unwrap();
    let c = [
        Color::rgb(1, 0, 0),
        Color::rgb(2, 0, 0),
        Color::rgb(3, 0, 0),
        Color::rgb(4, 0, 0),
    ];
    for (i, color) in c.iter().enumerate() {
        source
            .whole_selection_mut()
            .set_color(i as i32 % 2, i as i32 / 2, *color);
    }
    source.upload();
    let copy = device
        .link_program(
            ProgramSource::new("copy")
                .uniform("source", UniformKind::Sampler)
                .fragment(|f, inputs| inputs.sample("source", f.u, f.v)),
        )
        .unwrap()
        .accelerated_command(|renderer: &mut Renderer<'_>, inputs: &[TextureSelection]| {
            renderer.bind_texture(0, "source", &inputs[0]);
            renderer.draw_quad();
        });

    //right column of the source
    let mut target = device.new_image(1, 2).unwrap();
    target
        .whole_selection()
        .modify(&copy, &[source.selection(1, 0).with_size(1, 2)]);
    target.download();
    assert_eq!(target.pixels(), &[c[1], c[3]]);
}

#[test]
fn triangles_interpolate_varyings() {
    let device = device("triangles");
    let program = device
        .link_program(
            ProgramSource::new("gradient")
                .attribute("position", 2)
                .attribute("red", 1)
                .fragment(|f, _| Color::from_floats([f.varyings[0], 0.0, 0.0, 1.0].into())),
        )
        .unwrap();
    #[rustfmt::skip]
    let buffer = device
        .new_buffer(vec![
            -1.0, -1.0, 0.0,   1.0, -1.0, 1.0,   1.0, 1.0, 1.0,
            -1.0, -1.0, 0.0,   1.0, 1.0, 1.0,   -1.0, 1.0, 0.0,
        ])
        .unwrap();
    let vertex_array = device
        .new_vertex_array(vec![
            VertexAttribute { buffer, components: 2, stride: 3, offset: 0 },
            VertexAttribute { buffer, components: 1, stride: 3, offset: 2 },
        ])
        .unwrap();
    let command = program.accelerated_command(
        move |renderer: &mut Renderer<'_>, _: &[TextureSelection]| {
            renderer.draw_triangles(vertex_array, 0, 6);
        },
    );
    let mut image = device.new_image(4, 1).unwrap();
    image.whole_selection().modify(&command, &[]);
    image.download();
    let reds: Vec<u8> = image.pixels().iter().map(|c| c.r()).collect();
    assert!(reds.windows(2).all(|w| w[0] < w[1]), "{reds:?}");
    assert!(image.pixels().iter().all(|c| c.a() == 255));
}

#[test]
#[should_panic(expected = "no active uniform")]
fn unknown_uniform_panics() {
    let device = device("unknown_uniform");
    let image = device.new_image(1, 1).unwrap();
    let command = fill_program(&device).accelerated_command(
        |renderer: &mut Renderer<'_>, _: &[TextureSelection]| {
            renderer.set_float("brightness", 1.0);
        },
    );
    image.whole_selection().modify(&command, &[]);
}

#[test]
#[should_panic(expected = "different devices")]
fn cross_context_panics() {
    let a = device("context_a");
    let b = device("context_b");
    let image = a.new_image(1, 1).unwrap();
    image.whole_selection().modify(&fill(&b, RED), &[]);
}

#[test]
#[should_panic(expected = "different devices")]
fn foreign_input_panics_even_for_an_empty_output() {
    let a = device("input_a");
    let b = device("input_b");
    let image = a.new_image(1, 1).unwrap();
    let foreign = b.new_image(1, 1).unwrap();
    let empty = image.bounds().clamp(1, 0, 1, 1);
    assert!(empty.is_empty());
    let input = AcceleratedImageSelection::new(foreign.accelerated(), foreign.bounds().whole());
    image
        .accelerated()
        .modify(empty, &fill(&a, RED), &[input]);
}

#[test]
#[should_panic(expected = "use of deleted program")]
fn use_after_delete_panics() {
    let device = device("deleted");
    let image = device.new_image(1, 1).unwrap();
    let command = fill(&device, RED);
    command.program().clone().delete();
    image.whole_selection().modify(&command, &[]);
}

#[test]
fn dropped_images_release_their_textures() {
    let device = device("release");
    let image = device.new_image(8, 8).unwrap();
    assert_eq!(device.execute(|context| context.texture_count()), 1);
    drop(image);
    assert_eq!(device.execute(|context| context.texture_count()), 0);
    assert_eq!(device.execute(|context| context.allocated_bytes()), 0);
}

#[test]
fn out_of_memory_then_context_lost() {
    let device = device_with("oom", DeviceConfig::default().memory_budget(Some(100)));
    let _image: Image = device.new_image(4, 4).unwrap();
    let err = device.new_image(4, 4).unwrap_err();
    assert_eq!(
        err,
        DriverError::OutOfMemory {
            requested: 64,
            available: 36
        }
    );
    assert!(err.is_context_lost());
    assert_eq!(device.new_image(1, 1).unwrap_err(), DriverError::ContextLost);
    assert!(device.is_lost());
}

#[test]
fn upload_then_download_is_ordered_across_threads() {
    let device = device("ordered");
    let image = Arc::new(device.new_image(3, 1).unwrap());
    let pixels = vec![Color::WHITE, Color::BLACK, Color::gray(7)];
    let writer = {
        let image = image.clone();
        let pixels = pixels.clone();
        std::thread::spawn(move || image.accelerated().upload(&pixels))
    };
    writer.join().expect("writer");
    assert_eq!(image.accelerated().download_vec(), pixels);
}

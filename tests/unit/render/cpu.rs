use super::*;

fn px(bytes: &[u8], canvas: Canvas, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * canvas.width + x) * 4) as usize;
    [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]
}

#[test]
fn backdrop_is_opaque_with_solid_floor() {
    let canvas = Canvas::new(80, 60).unwrap();
    let bytes = bake_backdrop(canvas);
    assert_eq!(bytes.len(), canvas.rgba_len());
    assert!(bytes.chunks_exact(4).all(|p| p[3] == 255));
    assert_eq!(px(&bytes, canvas, 0, 59), [0x0f, 0x17, 0x2a, 255]);
    assert_eq!(px(&bytes, canvas, 79, 45), [0x0f, 0x17, 0x2a, 255]);
}

#[test]
fn spotlight_brightens_towards_its_centre() {
    let canvas = Canvas::new(200, 100).unwrap();
    let bytes = bake_backdrop(canvas);
    let near = px(&bytes, canvas, 110, 0);
    let far = px(&bytes, canvas, 0, 70);
    assert!(near[0] > far[0] + 20, "near={near:?} far={far:?}");
}

#[test]
fn spotlight_falloff_is_linear_between_radii() {
    assert_eq!(spotlight_alpha(0.0, 100.0), SPOT_PEAK_ALPHA);
    assert_eq!(spotlight_alpha(100.0, 100.0), 0.0);
    assert_eq!(spotlight_alpha(500.0, 100.0), 0.0);
    let mid = spotlight_alpha(55.0, 100.0);
    assert!((mid - SPOT_PEAK_ALPHA * 0.5).abs() < 1e-12);
}

#[test]
fn empty_plan_reproduces_backdrop() {
    let canvas = Canvas::new(32, 24).unwrap();
    let mut cache = BackdropCache::default();
    let plan = FramePlan {
        canvas,
        ops: Vec::new(),
    };
    let frame = execute_plan(&plan, cache.get_or_bake(canvas).unwrap()).unwrap();
    let baked = bake_backdrop(canvas);
    assert!(frame.premultiplied);
    for (a, b) in frame.data.iter().zip(baked.iter()) {
        assert!(a.abs_diff(*b) <= 2, "{a} vs {b}");
    }
}

#[test]
fn fill_op_paints_inside_its_path() {
    let canvas = Canvas::new(32, 32).unwrap();
    let mut cache = BackdropCache::default();
    let mut path = BezPath::new();
    path.move_to((8.0, 8.0));
    path.line_to((24.0, 8.0));
    path.line_to((24.0, 24.0));
    path.line_to((8.0, 24.0));
    path.close_path();
    let plan = FramePlan {
        canvas,
        ops: vec![DrawOp::Fill {
            path,
            transform: Affine::IDENTITY,
            color: Rgba8::hex(0xff0000),
        }],
    };
    let frame = execute_plan(&plan, cache.get_or_bake(canvas).unwrap()).unwrap();
    assert_eq!(frame.pixel(16, 16), Some([255, 0, 0, 255]));
    assert_ne!(frame.pixel(2, 2), Some([255, 0, 0, 255]));
}

#[test]
fn cache_bakes_once_per_canvas() {
    let mut cache = BackdropCache::default();
    let a = Canvas::new(16, 16).unwrap();
    let b = Canvas::new(32, 16).unwrap();
    cache.get_or_bake(a).unwrap();
    cache.get_or_bake(a).unwrap();
    cache.get_or_bake(b).unwrap();
    assert_eq!(cache.images.len(), 2);
}

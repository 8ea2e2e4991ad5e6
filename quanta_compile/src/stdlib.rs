use crate::{environment::Context, types::NativeFunc};

pub fn init(ctx: &mut Context) {
    init_io(ctx);
}

pub fn init_io(ctx: &mut Context) {
    // print(value)
    ctx.add_native(NativeFunc {
        name: "print".to_string(),
        params: vec!["value".to_string()],
        body: |_, args| {
            for arg in args {
                println!("{arg}");
            }
            Ok(None)
        },
    });
}

use nu_plugin::{serve_plugin, MsgPackSerializer};
use nu_plugin_folders::FoldersPlugin;

fn main() {
    serve_plugin(&FoldersPlugin, MsgPackSerializer {})
}

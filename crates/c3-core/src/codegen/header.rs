//! C header emission for `output_headers` builds.
//!
//! Emits one header per module describing its public surface: constants
//! as defines, globals and functions as extern declarations under their
//! mangled names.

use std::io;
use std::path::PathBuf;

use tracing::debug;

use crate::codegen::mangle;
use crate::compiler::CompileError;
use crate::context::GlobalContext;
use crate::decl::{DeclKind, Visibility};
use crate::ids::{ModuleId, TypeInfoId};
use crate::syntax::ast::{BuiltinType, TypeInfoKind};
use crate::target::BuildTarget;

/// Emit the header file for one module. Returns the header path.
pub fn header_gen(
    ctx: &mut GlobalContext,
    target: &BuildTarget,
    module_id: ModuleId,
) -> Result<PathBuf, CompileError> {
    let module_name = ctx.str(ctx.module(module_id).name);
    let flat_name = module_name.replace('.', "_");
    let decls = ctx.module(module_id).decls.clone();

    let mut out = String::new();
    let guard = format!("C3_{}_H", flat_name.to_uppercase());
    out.push_str(&format!("#ifndef {}\n#define {}\n\n", guard, guard));
    out.push_str(&format!("/* module {} */\n", module_name));
    out.push_str("#include <stdint.h>\n#include <stdbool.h>\n\n");

    for decl_id in decls {
        let decl = ctx.decl_arena.deref(decl_id);
        if decl.pruned || decl.visibility != Visibility::Public {
            continue;
        }
        let name = ctx.str(decl.name);
        match decl.kind.clone() {
            DeclKind::Var {
                is_const: true,
                const_value,
                ..
            } => {
                let value = const_value.unwrap_or(0);
                out.push_str(&format!("#define {}_{} {}\n", flat_name, name, value));
            }
            DeclKind::Var {
                is_const: false,
                type_info,
                ..
            } => {
                let c_type = type_info
                    .map(|t| render_c_type(ctx, t))
                    .unwrap_or_else(|| "int64_t".to_string());
                let mangled = mangle(ctx, &module_name, &name)?;
                out.push_str(&format!("extern {} {};\n", c_type, mangled));
            }
            DeclKind::Func {
                ret_type, params, ..
            } => {
                let ret = ret_type
                    .map(|t| render_c_type(ctx, t))
                    .unwrap_or_else(|| "void".to_string());
                let param_list = if params.is_empty() {
                    "void".to_string()
                } else {
                    params
                        .iter()
                        .map(|p| render_c_type(ctx, p.type_info))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let mangled = mangle(ctx, &module_name, &name)?;
                out.push_str(&format!("extern {} {}({});\n", ret, mangled, param_list));
            }
            DeclKind::TypeDef { underlying } => {
                let c_type = render_c_type(ctx, underlying);
                out.push_str(&format!("typedef {} {}_{};\n", c_type, flat_name, name));
            }
            _ => {}
        }
    }

    out.push_str(&format!("\n#endif /* {} */\n", guard));

    let path = target.obj_dir.join(format!("{}.h", flat_name));
    std::fs::write(&path, out).map_err(map_io)?;
    debug!(module = %module_name, header = %path.display(), "header emitted");
    Ok(path)
}

fn render_c_type(ctx: &GlobalContext, type_id: TypeInfoId) -> String {
    match ctx.type_info_arena.deref(type_id).kind.clone() {
        TypeInfoKind::Builtin(builtin) => builtin.c_name().to_string(),
        TypeInfoKind::Pointer(inner) => format!("{}*", render_c_type(ctx, inner)),
        TypeInfoKind::Named(name) => {
            // Typedefs flatten to their underlying type in headers.
            let local = ctx
                .find_symbol(name)
                .and_then(|s| s.as_decl())
                .map(|d| ctx.decl_arena.deref(d).kind.clone());
            match local {
                Some(DeclKind::TypeDef { underlying }) => render_c_type(ctx, underlying),
                _ => BuiltinType::Long.c_name().to_string(),
            }
        }
        TypeInfoKind::Unparsed => "void".to_string(),
    }
}

fn map_io(err: io::Error) -> CompileError {
    CompileError::Io(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema;
    use crate::syntax::parser::parse_file;

    #[test]
    fn test_header_contains_public_surface_only() {
        let mut ctx = GlobalContext::new(None, 1024);
        let id = ctx.sources.add_inline(
            "module net.http;\n\
             public const int MAX_CONN = 64;\n\
             public fn int listen(int port) { return 0; }\n\
             fn void private_helper() {}\n",
        );
        let (_, ok) = parse_file(&mut ctx, id);
        assert!(ok);
        sema::analyze_all(&mut ctx).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = BuildTarget {
            obj_dir: dir.path().to_path_buf(),
            ..BuildTarget::default()
        };
        let module = ctx.module_list[0];
        let path = header_gen(&mut ctx, &target, module).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("#ifndef C3_NET_HTTP_H"));
        assert!(contents.contains("#define net_http_MAX_CONN 64"));
        assert!(contents.contains("extern int32_t net_http_listen(int32_t);"));
        assert!(!contents.contains("private_helper"));
    }
}

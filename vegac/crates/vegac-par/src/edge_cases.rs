//! Edge case tests for vegac-par.

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::test_helpers::{parse_expr_source, parse_source, parse_stmt_source};

    #[test]
    fn test_edge_deeply_nested_parens() {
        let source = format!("{}1{}", "(".repeat(64), ")".repeat(64));
        let (expr, handler) = parse_expr_source(&source);
        assert!(!handler.has_errors());
        assert!(matches!(expr.unwrap().kind, ExprKind::Int(1)));
    }

    #[test]
    fn test_edge_empty_call() {
        let (expr, handler) = parse_expr_source("f()");
        assert!(!handler.has_errors());
        let ExprKind::Call(call) = expr.unwrap().kind else {
            panic!("expected call");
        };
        assert!(call.args.is_empty());
    }

    #[test]
    fn test_edge_empty_array() {
        let (expr, handler) = parse_expr_source("[]");
        assert!(!handler.has_errors());
        let ExprKind::Array(elements) = expr.unwrap().kind else {
            panic!("expected array");
        };
        assert!(elements.is_empty());
    }

    #[test]
    fn test_edge_missing_closing_brace() {
        let (_, handler) = parse_source("fn main() { let x = 1;");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_edge_missing_arg_after_comma() {
        let (_, handler) = parse_expr_source("f(1,)");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_edge_spawn_requires_name() {
        let (_, handler) = parse_expr_source("spawn 42");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_edge_match_rejects_bare_arm() {
        let (_, handler) = parse_expr_source("match r { v => v }");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_edge_match_empty_body() {
        let (expr, handler) = parse_expr_source("match r { }");
        assert!(!handler.has_errors());
        let ExprKind::Match(match_expr) = expr.unwrap().kind else {
            panic!("expected match");
        };
        assert!(match_expr.arms.is_empty());
    }

    #[test]
    fn test_edge_statement_after_error_recovers() {
        let source = "fn main() { let = 0; let ok = 1; }";
        let (program, handler) = parse_source(source);
        assert!(handler.has_errors());

        // The statement after the sync point is still parsed.
        let DeclKind::Function(func) = &program.decls[0].kind else {
            panic!("expected function");
        };
        assert!(func
            .body
            .stmts
            .iter()
            .any(|s| matches!(&s.kind, StmtKind::Let(l) if l.name.as_str() == "ok")));
    }

    #[test]
    fn test_edge_two_declarations() {
        let source = "fn a() { } fn b() { }";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors());
        assert_eq!(program.decls.len(), 2);
    }

    #[test]
    fn test_edge_stray_top_level_token() {
        let (_, handler) = parse_source("42;");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_edge_else_requires_block_or_if() {
        let (_, handler) = parse_stmt_source("if a { } else return;");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_edge_send_payload_stops_at_additive() {
        // a <- b + c  parses as  (a <- b) + c  because send binds tighter
        // than additive operators.
        let (expr, handler) = parse_expr_source("a <- b + c");
        assert!(!handler.has_errors());
        let ExprKind::Binary(outer) = expr.unwrap().kind else {
            panic!("expected binary");
        };
        assert_eq!(outer.op, BinOp::Add);
        assert!(matches!(outer.lhs.kind, ExprKind::Send(_)));
    }
}

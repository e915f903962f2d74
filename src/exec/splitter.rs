/// Splits a SQL script into executable statements.
///
/// Statements are separated on semicolons outside of string literals.
/// `--` line comments and `/* */` block comments are dropped entirely, so
/// fragments that contain only comments never reach the driver.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                // Copy the literal through, honouring doubled-quote escapes.
                current.push(c);
                while let Some(inner) = chars.next() {
                    current.push(inner);
                    if inner == c {
                        if chars.peek() == Some(&c) {
                            current.push(chars.next().unwrap());
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut last = '\0';
                for inner in chars.by_ref() {
                    if last == '*' && inner == '/' {
                        break;
                    }
                    last = inner;
                }
            }
            ';' => {
                let stmt = current.trim();
                if !stmt.is_empty() {
                    statements.push(stmt.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    let stmt = current.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }

    statements
}

/// True for statements that produce a result set rather than a row count.
pub fn is_query(stmt: &str) -> bool {
    let first = stmt
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase();
    matches!(
        first.as_str(),
        "SELECT" | "WITH" | "SHOW" | "PRAGMA" | "EXPLAIN" | "VALUES" | "DESCRIBE" | "DESC"
    )
}

/// Short single-line form of a statement for the execution log.
pub fn snippet(stmt: &str) -> String {
    let flat = stmt.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > 72 {
        let truncated: String = flat.chars().take(72).collect();
        format!("{}...", truncated)
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_semicolons() {
        let stmts = split_statements("CREATE TABLE a (id INTEGER); INSERT INTO a VALUES (1);");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "CREATE TABLE a (id INTEGER)");
        assert_eq!(stmts[1], "INSERT INTO a VALUES (1)");
    }

    #[test]
    fn keeps_semicolons_inside_string_literals() {
        let stmts = split_statements("INSERT INTO a VALUES ('x;y'); SELECT 1");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "INSERT INTO a VALUES ('x;y')");
    }

    #[test]
    fn honours_doubled_quote_escapes() {
        let stmts = split_statements("INSERT INTO a VALUES ('it''s; fine')");
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0], "INSERT INTO a VALUES ('it''s; fine')");
    }

    #[test]
    fn drops_comments() {
        let stmts = split_statements(
            "-- leading comment\nCREATE TABLE a (id INTEGER); /* block;\ncomment */ SELECT 1;",
        );
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "CREATE TABLE a (id INTEGER)");
        assert_eq!(stmts[1], "SELECT 1");
    }

    #[test]
    fn comment_only_input_yields_nothing() {
        assert!(split_statements("-- nothing here\n/* or here */").is_empty());
        assert!(split_statements("   \n\t ").is_empty());
    }

    #[test]
    fn final_statement_without_semicolon_is_kept() {
        let stmts = split_statements("SELECT 1");
        assert_eq!(stmts, vec!["SELECT 1".to_string()]);
    }

    #[test]
    fn classifies_queries() {
        assert!(is_query("SELECT * FROM t"));
        assert!(is_query("with x as (select 1) select * from x"));
        assert!(is_query("PRAGMA table_info(t)"));
        assert!(!is_query("CREATE TABLE t (id INTEGER)"));
        assert!(!is_query("INSERT INTO t VALUES (1)"));
    }

    #[test]
    fn snippet_truncates_and_flattens() {
        let s = snippet("SELECT\n  a,\n  b\nFROM t");
        assert_eq!(s, "SELECT a, b FROM t");
        let long = format!("SELECT {}", "x".repeat(100));
        assert!(snippet(&long).ends_with("..."));
    }
}

//! Replays a schema sequence into DDL statements.

use super::column::{ColumnBuilder, ColumnType, DefaultValue};
use super::table::{TableAction, TableBuilder};
use super::{SchemaBuilder, SchemaCommand};
use crate::builder::SqlValue;
use crate::compiler::{compile_raw, CompiledStatement, Method};
use crate::encode::TimeZone;
use crate::error::{CompileError, EncodingError, Result};
use crate::ident::{quote_identifier, quote_literal, quote_qualified};
use crate::materialize::inline;

const HAS_TABLE_SQL: &str = "select * from information_schema.tables where table_name = ?";
const HAS_COLUMN_SQL: &str =
    "select * from information_schema.columns where table_name = ? and column_name = ?";

pub(crate) fn compile_schema(schema: &SchemaBuilder) -> Result<Vec<CompiledStatement>> {
    let mut out = vec![];
    for command in schema.commands() {
        match command {
            SchemaCommand::Table(table) => compile_table(table, &mut out)?,
            SchemaCommand::DropTable { name, if_exists } => out.push(CompiledStatement::ddl(format!(
                "drop table {}{}",
                if_exists_keyword(*if_exists),
                quote_qualified(name)
            ))),
            SchemaCommand::RenameTable { from, to } => out.push(CompiledStatement::ddl(format!(
                "alter table {} rename to {}",
                quote_qualified(from),
                quote_identifier(to)
            ))),
            SchemaCommand::CreateSchema {
                name,
                if_not_exists,
            } => out.push(CompiledStatement::ddl(format!(
                "create schema {}{}",
                if_not_exists_keyword(*if_not_exists),
                quote_identifier(name)
            ))),
            SchemaCommand::DropSchema { name, if_exists } => {
                out.push(CompiledStatement::ddl(format!(
                    "drop schema {}{}",
                    if_exists_keyword(*if_exists),
                    quote_identifier(name)
                )));
            }
            SchemaCommand::CreateExtension {
                name,
                if_not_exists,
            } => out.push(CompiledStatement::ddl(format!(
                "create extension {}{}",
                if_not_exists_keyword(*if_not_exists),
                quote_identifier(name)
            ))),
            SchemaCommand::DropExtension { name, if_exists } => {
                out.push(CompiledStatement::ddl(format!(
                    "drop extension {}{}",
                    if_exists_keyword(*if_exists),
                    quote_identifier(name)
                )));
            }
            SchemaCommand::HasTable(name) => out.push(CompiledStatement::new(
                HAS_TABLE_SQL,
                vec![SqlValue::Text(name.clone())],
                Method::Select,
            )),
            SchemaCommand::HasColumn { table, column } => out.push(CompiledStatement::new(
                HAS_COLUMN_SQL,
                vec![SqlValue::Text(table.clone()), SqlValue::Text(column.clone())],
                Method::Select,
            )),
            SchemaCommand::Raw(raw) => out.push(compile_raw(raw)?),
        }
    }
    Ok(out)
}

const fn if_exists_keyword(if_exists: bool) -> &'static str {
    if if_exists {
        "if exists "
    } else {
        ""
    }
}

const fn if_not_exists_keyword(if_not_exists: bool) -> &'static str {
    if if_not_exists {
        "if not exists "
    } else {
        ""
    }
}

fn compile_table(table: &TableBuilder, out: &mut Vec<CompiledStatement>) -> Result<()> {
    let name = quote_qualified(&table.name);
    let mut comments = vec![];

    match table.action {
        TableAction::Create | TableAction::CreateIfNotExists => {
            let columns = table
                .columns
                .iter()
                .map(|c| column_definition(&name, c, &mut comments))
                .collect::<Result<Vec<_>>>()?;
            let keyword = if table.action == TableAction::CreateIfNotExists {
                "create table if not exists"
            } else {
                "create table"
            };
            out.push(CompiledStatement::ddl(format!(
                "{keyword} {name} ({})",
                columns.join(", ")
            )));
        }
        TableAction::Alter => {
            for column in &table.columns {
                let definition = column_definition(&name, column, &mut comments)?;
                out.push(CompiledStatement::ddl(format!(
                    "alter table {name} add column {definition}"
                )));
            }
            for column in &table.dropped {
                out.push(CompiledStatement::ddl(format!(
                    "alter table {name} drop column {}",
                    quote_identifier(column)
                )));
            }
            for (from, to) in &table.renamed {
                out.push(CompiledStatement::ddl(format!(
                    "alter table {name} rename column {} to {}",
                    quote_identifier(from),
                    quote_identifier(to)
                )));
            }
        }
    }

    if let Some(ref comment) = table.comment {
        out.push(CompiledStatement::ddl(format!(
            "comment on table {name} is {}",
            comment_literal(comment)
        )));
    }
    out.extend(comments);
    Ok(())
}

fn comment_literal(comment: &str) -> String {
    if comment.is_empty() {
        String::from("NULL")
    } else {
        quote_literal(comment)
    }
}

fn column_definition(
    table: &str,
    column: &ColumnBuilder,
    comments: &mut Vec<CompiledStatement>,
) -> Result<String> {
    let is_increments = column.column_type.is_increments();
    let name = match column.name.as_str() {
        "" if is_increments => "id",
        "" => return Err(CompileError::MissingColumnName(column.column_type.name()).into()),
        name => name,
    };
    let quoted = quote_identifier(name);
    let mut sql = format!("{quoted} {}", type_sql(&column.column_type, &quoted));

    if is_increments {
        return Ok(sql);
    }

    if let Some(nullable) = column.nullable {
        sql.push_str(if nullable { " null" } else { " not null" });
    }
    if let Some(ref default) = column.default {
        sql.push_str(" default ");
        sql.push_str(&default_sql(default)?);
    }
    if let Some(ref comment) = column.comment {
        comments.push(CompiledStatement::ddl(format!(
            "comment on column {table}.{quoted} is {}",
            comment_literal(comment)
        )));
    }
    Ok(sql)
}

fn type_sql(column_type: &ColumnType, quoted_name: &str) -> String {
    match column_type {
        ColumnType::Increments => String::from("serial primary key"),
        ColumnType::BigIncrements => String::from("bigserial primary key"),
        ColumnType::Integer | ColumnType::MediumInt => String::from("integer"),
        ColumnType::SmallInt | ColumnType::TinyInt => String::from("smallint"),
        ColumnType::BigInteger => String::from("bigint"),
        ColumnType::String(length) => format!("varchar({length})"),
        ColumnType::Text => String::from("text"),
        ColumnType::Float => String::from("real"),
        ColumnType::Double => String::from("double precision"),
        ColumnType::Decimal { precision, scale } => format!("decimal({precision}, {scale})"),
        ColumnType::Binary => String::from("bytea"),
        ColumnType::Boolean => String::from("boolean"),
        ColumnType::Date => String::from("date"),
        ColumnType::DateTime { without_tz } | ColumnType::Timestamp { without_tz } => {
            String::from(if *without_tz { "timestamp" } else { "timestamptz" })
        }
        ColumnType::Time => String::from("time"),
        ColumnType::Enumeration(values) => {
            let allowed: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
            format!("text check ({quoted_name} in ({}))", allowed.join(", "))
        }
        ColumnType::Json { binary } => String::from(if *binary { "jsonb" } else { "json" }),
        ColumnType::Uuid => String::from("uuid"),
        ColumnType::Specific(sql_type) => sql_type.clone(),
    }
}

fn default_sql(default: &DefaultValue) -> Result<String> {
    Ok(match default {
        DefaultValue::Null => String::from("null"),
        DefaultValue::Boolean(b) => String::from(if *b { "'1'" } else { "'0'" }),
        DefaultValue::Integer(n) => quote_literal(&n.to_string()),
        DefaultValue::Float(f) => {
            if !f.is_finite() {
                return Err(EncodingError::NonFiniteNumber(f.to_string()).into());
            }
            quote_literal(&f.to_string())
        }
        DefaultValue::String(s) => quote_literal(s),
        DefaultValue::Json(value) => quote_literal(&value.to_string()),
        // DDL cannot be prepared, so any values are inlined.
        DefaultValue::Raw(raw) => inline(raw, TimeZone::default())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Raw;
    use serde_json::json;

    fn sqls(schema: &SchemaBuilder) -> Vec<String> {
        compile_schema(schema)
            .unwrap()
            .into_iter()
            .map(|s| s.sql)
            .collect()
    }

    #[test]
    fn test_create_table_column_types() {
        let schema = SchemaBuilder::new().create_table("t", |t| {
            t.increments("");
            t.string("name");
            t.decimal("price");
            t.timestamp("seen", true);
            t.datetime("at", false);
            t.tiny_int("small");
            t.jsonb("doc");
            t.specific_type("the_geom", "geometry(Geometry, 4326)");
        });
        assert_eq!(
            sqls(&schema),
            vec![
                "create table \"t\" (\"id\" serial primary key, \"name\" varchar(255), \
                 \"price\" decimal(8, 2), \"seen\" timestamp, \"at\" timestamptz, \
                 \"small\" smallint, \"doc\" jsonb, \"the_geom\" geometry(Geometry, 4326))"
            ]
        );
    }

    #[test]
    fn test_modifier_order_and_comment() {
        let schema = SchemaBuilder::new().create_table("t", |t| {
            t.boolean("flag").comment("it's on").default_to(true).not_nullable();
        });
        assert_eq!(
            sqls(&schema),
            vec![
                "create table \"t\" (\"flag\" boolean not null default '1')",
                "comment on column \"t\".\"flag\" is 'it''s on'",
            ]
        );
    }

    #[test]
    fn test_increments_skip_modifiers() {
        let schema = SchemaBuilder::new().create_table("t", |t| {
            t.big_increments("pk").not_nullable().comment("ignored");
        });
        assert_eq!(
            sqls(&schema),
            vec!["create table \"t\" (\"pk\" bigserial primary key)"]
        );
    }

    #[test]
    fn test_missing_column_name() {
        let schema = SchemaBuilder::new().create_table("t", |t| {
            t.text("");
        });
        assert_eq!(
            compile_schema(&schema).unwrap_err(),
            crate::Error::Compile(CompileError::MissingColumnName("text"))
        );
    }

    #[test]
    fn test_defaults() {
        let schema = SchemaBuilder::new().create_table("t", |t| {
            t.text("a").default_to(DefaultValue::Null);
            t.integer("b").default_to(5);
            t.json("c").default_to(json!({"k": "v"}));
            t.timestamp("d", false).default_to(Raw::new("now()"));
            t.boolean("e").default_to(false);
        });
        assert_eq!(
            sqls(&schema),
            vec![
                "create table \"t\" (\"a\" text default null, \"b\" integer default '5', \
                 \"c\" json default '{\"k\":\"v\"}', \"d\" timestamptz default now(), \
                 \"e\" boolean default '0')"
            ]
        );
    }

    #[test]
    fn test_enumeration() {
        let schema = SchemaBuilder::new().create_table("t", |t| {
            t.enumeration("kind", &["a", "b'c"]);
        });
        assert_eq!(
            sqls(&schema),
            vec!["create table \"t\" (\"kind\" text check (\"kind\" in ('a', 'b''c')))"]
        );
    }

    #[test]
    fn test_alter_table() {
        let schema = SchemaBuilder::new().table("t", |t| {
            t.integer("n").nullable();
            t.drop_column("old");
            t.rename_column("a", "b");
            t.comment("");
        });
        assert_eq!(
            sqls(&schema),
            vec![
                "alter table \"t\" add column \"n\" integer null",
                "alter table \"t\" drop column \"old\"",
                "alter table \"t\" rename column \"a\" to \"b\"",
                "comment on table \"t\" is NULL",
            ]
        );
    }

    #[test]
    fn test_other_commands() {
        let schema = SchemaBuilder::new()
            .create_table_if_not_exists("t", |t| {
                t.uuid("id");
            })
            .drop_table_if_exists("old")
            .rename_table("a", "b")
            .create_schema_if_not_exists("s")
            .drop_schema("s")
            .create_extension("postgis")
            .drop_extension_if_exists("postgis");
        assert_eq!(
            sqls(&schema),
            vec![
                "create table if not exists \"t\" (\"id\" uuid)",
                "drop table if exists \"old\"",
                "alter table \"a\" rename to \"b\"",
                "create schema if not exists \"s\"",
                "drop schema \"s\"",
                "create extension \"postgis\"",
                "drop extension if exists \"postgis\"",
            ]
        );
    }

    #[test]
    fn test_has_table_and_column_are_selects() {
        let statements = compile_schema(&SchemaBuilder::new().has_table("t").has_column("t", "c")).unwrap();
        assert_eq!(statements[0].sql, HAS_TABLE_SQL);
        assert_eq!(statements[0].method, Method::Select);
        assert_eq!(
            statements[1].bindings,
            crate::compiler::Bindings::Single(vec![
                SqlValue::Text(String::from("t")),
                SqlValue::Text(String::from("c")),
            ])
        );
    }
}

use crate::Result;
use crate::catalog::{Catalog, ColumnDeclaration};
use core::fmt::Write;

/// Dump every view of the catalog with its overrides and column declarations.
pub fn generate<W: Write>(catalog: &Catalog, writer: &mut W) -> Result<()> {
    for (namespace, columns) in catalog.namespaces() {
        match catalog.overrides_for(namespace) {
            Some(overrides) if !overrides.is_empty() => {
                for declaration in overrides {
                    writeln!(writer, "{namespace} [{}]", declaration.versions)?;
                    for line in declaration.query.lines().map(str::trim).filter(|l| !l.is_empty()) {
                        writeln!(writer, "    {line}")?;
                    }
                }
            }
            _ => writeln!(writer, "{namespace}")?,
        }

        for column in columns {
            writeln!(writer, "  {:<40} {}", column.name, column_details(column))?;
        }

        writeln!(writer)?;
    }

    Ok(())
}

fn column_details(column: &ColumnDeclaration) -> String {
    let mut details = column.role.to_string();

    if let Some(versions) = &column.versions {
        let _ = write!(details, " [{versions}]");
    }

    if let Some(mapping) = &column.mapping {
        let entries: Vec<_> = mapping.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let _ = write!(details, " {{{}}}", entries.join(", "));
    }

    if !column.description.is_empty() {
        let _ = write!(details, " {}", column.description);
    }

    details
}

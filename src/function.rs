use crate::{
    error::{Error, Result},
    ir::{operand_id, Ir},
    translator::Translator,
};
use rspirv::{
    dr::{Function, Operand},
    spirv::{FunctionControl, Op, StorageClass, Word},
};
use std::collections::BTreeSet;
use std::fmt::Write;

impl Translator {
    /// Emits one function: qualifiers and signature, then for definitions
    /// the hoisted Workgroup declarations (entry points only), phi register
    /// declarations, and each basic block as a label followed by its
    /// statements, phi fan-in assignments, and terminator.
    pub(crate) fn translate_function(&mut self, ir: &Ir, func: &Function) -> Result<()> {
        let def = func
            .def
            .as_ref()
            .ok_or_else(|| Error::msg("function without a definition"))?;
        let result = def
            .result_id
            .ok_or_else(|| Error::msg("function without a result id"))?;
        let rtype = def
            .result_type
            .ok_or_else(|| Error::msg("function without a return type"))?;
        let control = match def.operands.first() {
            Some(Operand::FunctionControl(control)) => *control,
            _ => return Err(Error::msg("malformed OpFunction")),
        };

        let entrypoint = self.entry_points.contains_key(&result);
        let declaration = self.imports.contains_key(&result);

        if self.contraction_off.contains(&result) {
            self.src.line("#pragma OPENCL FP_CONTRACT OFF");
        }

        let mut signature = String::new();
        if declaration {
            signature.push_str("extern ");
        } else if !self.exports.contains_key(&result) && !entrypoint {
            signature.push_str("static ");
        }
        if control.contains(FunctionControl::INLINE) {
            signature.push_str("inline ");
        }

        let _ = write!(signature, "{} ", self.src_type(rtype)?);
        if entrypoint {
            signature.push_str("kernel ");
            if let Some((x, y, z)) = self.local_sizes.get(&result) {
                let _ = write!(signature, "__attribute((reqd_work_group_size({x},{y},{z}))) ");
            }
            signature.push_str(&self.entry_points[&result]);
        } else {
            signature.push_str(&self.var_for(result));
        }

        signature.push('(');
        let mut sep = "";
        for param in &func.parameters {
            let ptype = param
                .result_type
                .ok_or_else(|| Error::msg("parameter without a type"))?;
            let pid = param
                .result_id
                .ok_or_else(|| Error::msg("parameter without a result id"))?;
            signature.push_str(sep);
            if self.nowrite_params.contains(&pid) {
                signature.push_str("const ");
            }
            signature.push_str(&self.src_mem_object_decl_for(ir, ptype, pid)?);
            sep = ", ";
        }
        signature.push(')');

        if declaration {
            signature.push(';');
            self.src.line(&signature);
            return Ok(());
        }
        signature.push('{');
        self.src.line(&signature);

        // A kernel must declare every Workgroup-storage global its call
        // tree touches before the first statement.
        if entrypoint {
            for lvarid in self.workgroup_globals_reachable_from(ir, result)? {
                let decl = self
                    .local_var_decls
                    .get(&lvarid)
                    .cloned()
                    .ok_or_else(|| Error::unknown_id(lvarid))?;
                self.src.line(&format!("{decl};"));
            }
        }

        self.collect_phis(func)?;

        for phival in self.phi_vals.clone() {
            let phitype = ir.type_id_of(phival)?;
            let line = format!("  {} {};", self.src_type(phitype)?, self.var_for(phival));
            self.src.line(&line);
        }

        for block in &func.blocks {
            let block_id = block
                .label
                .as_ref()
                .and_then(|label| label.result_id)
                .ok_or_else(|| Error::msg("block without a label"))?;
            self.src.line(&format!("{}:;", self.var_for(block_id)));

            let (body, terminator) = match block.instructions.split_last() {
                Some((terminator, body)) => (body, terminator),
                None => continue,
            };

            for inst in body {
                if let Some(text) = self.translate_instruction(ir, inst)? {
                    self.src.line(&format!("  {text};"));
                }
            }

            // phi fan-in runs on the edge, before the branch out of this block.
            if let Some(assigns) = self.phi_assigns.get(&block_id).cloned() {
                for (phi, value) in assigns {
                    let line = format!("  {} = {};", self.var_for(phi), self.var_for(value));
                    self.src.line(&line);
                }
            }

            if let Some(text) = self.translate_instruction(ir, terminator)? {
                self.src.line(&format!("  {text};"));
            }
        }

        self.src.line("}");

        if self.contraction_off.contains(&result) {
            self.src.line("#pragma OPENCL FP_CONTRACT ON");
        }
        return Ok(());
    }

    /// Records this function's phi registers and the per-edge assignments
    /// that feed them. Cleared and rebuilt for every function.
    fn collect_phis(&mut self, func: &Function) -> Result<()> {
        self.phi_vals.clear();
        self.phi_assigns.clear();

        for block in &func.blocks {
            for inst in &block.instructions {
                if inst.class.opcode != Op::Phi {
                    continue;
                }
                let result = inst
                    .result_id
                    .ok_or_else(|| Error::msg("OpPhi without a result id"))?;
                self.phi_vals.push(result);

                for pair in inst.operands.chunks(2) {
                    let (Some(value), Some(parent)) = (
                        pair.first().and_then(operand_id),
                        pair.get(1).and_then(operand_id),
                    ) else {
                        return Err(Error::msg("malformed OpPhi"));
                    };
                    self.phi_assigns
                        .entry(parent)
                        .or_default()
                        .push((result, value));
                }
            }
        }
        return Ok(());
    }

    /// Workgroup-storage globals reachable from `root`'s call tree,
    /// discovered over `OpFunctionCall` operands with a worklist. Sorted by
    /// id so emission order is stable.
    fn workgroup_globals_reachable_from(&self, ir: &Ir, root: Word) -> Result<BTreeSet<Word>> {
        let mut used = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut worklist = vec![root];

        while let Some(fid) = worklist.pop() {
            if !visited.insert(fid) {
                continue;
            }
            let Some(func) = ir.function(fid) else {
                continue;
            };
            for block in &func.blocks {
                for inst in &block.instructions {
                    if inst.class.opcode == Op::FunctionCall {
                        if let Some(callee) = inst.operands.first().and_then(operand_id) {
                            worklist.push(callee);
                        }
                    }
                    for used_id in inst.operands.iter().filter_map(operand_id) {
                        let Some(def) = ir.def(used_id) else {
                            continue;
                        };
                        if def.class.opcode == Op::Variable
                            && matches!(
                                def.operands.first(),
                                Some(Operand::StorageClass(StorageClass::Workgroup))
                            )
                        {
                            used.insert(used_id);
                        }
                    }
                }
            }
        }
        return Ok(used);
    }
}
